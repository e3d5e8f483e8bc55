use crate::app_dirs::AppDirs;
use crate::error::Result;
use crate::session::SessionState;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// End-of-session summary handed to persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultStats {
    pub game_type_key: String,
    pub time_elapsed_ms: u64,
    pub percent_correct_on_first_try: u32,
    pub points_toward_win: i64,
    pub problems_attempted: u32,
    pub max_reached_points_toward_win: i64,
}

/// Latest result document stored per user (the personal-best summary).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalBest {
    pub stats: ResultStats,
    pub timestamp: DateTime<Utc>,
}

/// One finished session, optionally played as part of an assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub user_id: String,
    pub assignment_id: Option<String>,
    pub outcome: SessionState,
    pub stats: ResultStats,
    pub timestamp: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn new(
        user_id: impl Into<String>,
        assignment_id: Option<String>,
        outcome: SessionState,
        stats: ResultStats,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            assignment_id,
            outcome,
            stats,
            timestamp: Utc::now(),
        }
    }
}

fn outcome_from_str(s: &str) -> SessionState {
    match s {
        "won" => SessionState::Won,
        "timed_out" => SessionState::TimedOut,
        _ => SessionState::Active,
    }
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| {
            rusqlite::Error::InvalidColumnType(idx, "timestamp".to_string(), rusqlite::types::Type::Text)
        })
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS personal_bests (
        user_id TEXT PRIMARY KEY,
        stats_json TEXT NOT NULL,
        timestamp TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS attempts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        assignment_id TEXT,
        outcome TEXT NOT NULL,
        game_type_key TEXT NOT NULL,
        time_elapsed_ms INTEGER NOT NULL,
        percent_correct_on_first_try INTEGER NOT NULL,
        points_toward_win INTEGER NOT NULL,
        problems_attempted INTEGER NOT NULL,
        max_reached_points_toward_win INTEGER NOT NULL,
        timestamp TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_attempts_user ON attempts(user_id, assignment_id);

    CREATE TABLE IF NOT EXISTS assignments (
        user_id TEXT NOT NULL,
        id TEXT NOT NULL,
        name TEXT NOT NULL,
        due_text TEXT NOT NULL,
        is_active BOOLEAN NOT NULL,
        version INTEGER NOT NULL,
        game_types_json TEXT NOT NULL,
        created_at TEXT NOT NULL,
        PRIMARY KEY (user_id, id)
    );
"#;

/// Local document store for results and assignments
#[derive(Debug)]
pub struct StatsDb {
    conn: Connection,
}

impl StatsDb {
    /// Open the database at the default location, creating it if needed
    pub fn open_default() -> Result<Self> {
        let path = Self::default_path().unwrap_or_else(|| PathBuf::from("mathdrill.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(StatsDb { conn })
    }

    pub fn default_path() -> Option<PathBuf> {
        AppDirs::db_path()
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Create or replace the user's latest result document
    pub fn save_personal_best(&self, user_id: &str, stats: &ResultStats) -> Result<()> {
        let json = serde_json::to_string(stats)?;
        self.conn.execute(
            r#"
            INSERT INTO personal_bests (user_id, stats_json, timestamp)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id) DO UPDATE SET
                stats_json = excluded.stats_json,
                timestamp = excluded.timestamp
            "#,
            params![user_id, json, Utc::now().to_rfc3339()],
        )?;
        info!(user_id, game = %stats.game_type_key, "saved personal best");
        Ok(())
    }

    pub fn personal_best(&self, user_id: &str) -> Result<Option<PersonalBest>> {
        let row = self
            .conn
            .query_row(
                "SELECT stats_json, timestamp FROM personal_bests WHERE user_id = ?1",
                [user_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        match row {
            Some((json, ts)) => Ok(Some(PersonalBest {
                stats: serde_json::from_str(&json)?,
                timestamp: parse_timestamp(1, &ts)?,
            })),
            None => Ok(None),
        }
    }

    /// Append a finished session to the attempt history
    pub fn record_attempt(&self, attempt: &AttemptRecord) -> Result<i64> {
        let s = &attempt.stats;
        self.conn.execute(
            r#"
            INSERT INTO attempts
            (user_id, assignment_id, outcome, game_type_key, time_elapsed_ms,
             percent_correct_on_first_try, points_toward_win, problems_attempted,
             max_reached_points_toward_win, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                attempt.user_id,
                attempt.assignment_id,
                attempt.outcome.to_string(),
                s.game_type_key,
                s.time_elapsed_ms,
                s.percent_correct_on_first_try,
                s.points_toward_win,
                s.problems_attempted,
                s.max_reached_points_toward_win,
                attempt.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Attempts of a user, newest first. With `assignment_id` only the attempts
    /// played for that assignment are returned.
    pub fn attempts(&self, user_id: &str, assignment_id: Option<&str>) -> Result<Vec<AttemptRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT user_id, assignment_id, outcome, game_type_key, time_elapsed_ms,
                   percent_correct_on_first_try, points_toward_win, problems_attempted,
                   max_reached_points_toward_win, timestamp
            FROM attempts
            WHERE user_id = ?1 AND (?2 IS NULL OR assignment_id = ?2)
            ORDER BY timestamp DESC, id DESC
            "#,
        )?;

        let rows = stmt.query_map(params![user_id, assignment_id], |row| {
            let outcome: String = row.get(2)?;
            let timestamp: String = row.get(9)?;
            Ok(AttemptRecord {
                user_id: row.get(0)?,
                assignment_id: row.get(1)?,
                outcome: outcome_from_str(&outcome),
                stats: ResultStats {
                    game_type_key: row.get(3)?,
                    time_elapsed_ms: row.get(4)?,
                    percent_correct_on_first_try: row.get(5)?,
                    points_toward_win: row.get(6)?,
                    problems_attempted: row.get(7)?,
                    max_reached_points_toward_win: row.get(8)?,
                },
                timestamp: parse_timestamp(9, &timestamp)?,
            })
        })?;

        let mut attempts = Vec::new();
        for attempt in rows {
            attempts.push(attempt?);
        }
        Ok(attempts)
    }

    /// Write a user's attempts as CSV, returning the number of rows written
    pub fn export_attempts_csv<W: Write>(&self, user_id: &str, writer: W) -> Result<usize> {
        let attempts = self.attempts(user_id, None)?;
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record([
            "timestamp",
            "assignment_id",
            "outcome",
            "game_type_key",
            "time_elapsed_ms",
            "percent_correct_on_first_try",
            "points_toward_win",
            "problems_attempted",
            "max_reached_points_toward_win",
        ])?;
        for a in &attempts {
            wtr.write_record([
                a.timestamp.to_rfc3339(),
                a.assignment_id.clone().unwrap_or_default(),
                a.outcome.to_string(),
                a.stats.game_type_key.clone(),
                a.stats.time_elapsed_ms.to_string(),
                a.stats.percent_correct_on_first_try.to_string(),
                a.stats.points_toward_win.to_string(),
                a.stats.problems_attempted.to_string(),
                a.stats.max_reached_points_toward_win.to_string(),
            ])?;
        }
        wtr.flush()?;
        Ok(attempts.len())
    }

    /// Clear all stored data (for testing or reset purposes)
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute_batch(
            "DELETE FROM personal_bests; DELETE FROM attempts; DELETE FROM assignments;",
        )?;
        Ok(())
    }
}
