//! Assignment documents kept per user in the local store.

use super::{AssignmentDraft, AssignmentRecord};
use crate::error::{DrillError, Result};
use crate::stats::StatsDb;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use tracing::info;

fn new_assignment_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<AssignmentRecord> {
    Ok(AssignmentRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        due_text: row.get(2)?,
        is_active: row.get(3)?,
        version: row.get(4)?,
        game_types_json: row.get(5)?,
    })
}

const SELECT_ASSIGNMENT: &str =
    "SELECT id, name, due_text, is_active, version, game_types_json FROM assignments";

impl StatsDb {
    pub fn create_assignment(
        &self,
        user_id: &str,
        draft: &AssignmentDraft,
    ) -> Result<AssignmentRecord> {
        let record = AssignmentRecord::from_draft(new_assignment_id(), draft.clone());
        self.conn().execute(
            r#"
            INSERT INTO assignments
            (user_id, id, name, due_text, is_active, version, game_types_json, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                user_id,
                record.id,
                record.name,
                record.due_text,
                record.is_active,
                record.version,
                record.game_types_json,
                Utc::now().to_rfc3339(),
            ],
        )?;
        info!(user_id, id = %record.id, "created assignment");
        Ok(record)
    }

    pub fn assignment(&self, user_id: &str, id: &str) -> Result<Option<AssignmentRecord>> {
        let record = self
            .conn()
            .query_row(
                &format!("{SELECT_ASSIGNMENT} WHERE user_id = ?1 AND id = ?2"),
                params![user_id, id],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Assignments of a user in creation order.
    pub fn assignments(&self, user_id: &str) -> Result<Vec<AssignmentRecord>> {
        let mut stmt = self.conn().prepare(&format!(
            "{SELECT_ASSIGNMENT} WHERE user_id = ?1 ORDER BY created_at, rowid"
        ))?;
        let rows = stmt.query_map([user_id], record_from_row)?;
        let mut records = Vec::new();
        for r in rows {
            records.push(r?);
        }
        Ok(records)
    }

    pub fn update_assignment(
        &self,
        user_id: &str,
        id: &str,
        draft: &AssignmentDraft,
    ) -> Result<AssignmentRecord> {
        let changed = self.conn().execute(
            r#"
            UPDATE assignments
            SET name = ?3, due_text = ?4, is_active = ?5, version = ?6, game_types_json = ?7
            WHERE user_id = ?1 AND id = ?2
            "#,
            params![
                user_id,
                id,
                draft.name,
                draft.due_text,
                draft.is_active,
                draft.version,
                draft.game_types_json,
            ],
        )?;
        if changed == 0 {
            return Err(DrillError::AssignmentNotFound(id.to_string()));
        }
        info!(user_id, id, "updated assignment");
        Ok(AssignmentRecord::from_draft(id, draft.clone()))
    }

    pub fn delete_assignment(&self, user_id: &str, id: &str) -> Result<()> {
        let changed = self.conn().execute(
            "DELETE FROM assignments WHERE user_id = ?1 AND id = ?2",
            params![user_id, id],
        )?;
        if changed == 0 {
            return Err(DrillError::AssignmentNotFound(id.to_string()));
        }
        info!(user_id, id, "deleted assignment");
        Ok(())
    }
}
