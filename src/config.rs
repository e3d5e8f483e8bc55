use crate::app_dirs::AppDirs;
use crate::error::{DrillError, Result};
use crate::generator::arithmetic::MULTIPLICATION_KEY;
use crate::session::{
    SessionConfig, DEFAULT_MAX_SESSION_DURATION_MS, DEFAULT_MIN_PROBLEMS_ATTEMPTED_TO_WIN,
    DEFAULT_POINTS_REQUIRED_TO_WIN,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub user_id: String,
    pub points_required_to_win: i64,
    pub min_problems_attempted_to_win: u32,
    pub max_session_minutes: u64,
    pub default_game: String,
    pub route_through_scheduler: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: "local".to_string(),
            points_required_to_win: DEFAULT_POINTS_REQUIRED_TO_WIN,
            min_problems_attempted_to_win: DEFAULT_MIN_PROBLEMS_ATTEMPTED_TO_WIN,
            max_session_minutes: DEFAULT_MAX_SESSION_DURATION_MS / 60_000,
            default_game: MULTIPLICATION_KEY.to_string(),
            route_through_scheduler: false,
        }
    }
}

impl Config {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            points_required_to_win: self.points_required_to_win,
            min_problems_attempted_to_win: self.min_problems_attempted_to_win,
            max_session_duration_ms: self.max_session_minutes.saturating_mul(60_000),
            route_through_scheduler: self.route_through_scheduler,
        }
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| DrillError::InvalidConfig(format!("invalid value for {key}: {value}")))
}

impl Config {
    pub const KEYS: [&'static str; 6] = [
        "user_id",
        "points_required_to_win",
        "min_problems_attempted_to_win",
        "max_session_minutes",
        "default_game",
        "route_through_scheduler",
    ];

    /// Set one field from its textual form, as given on the command line.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "user_id" => self.user_id = value.to_string(),
            "points_required_to_win" => self.points_required_to_win = parse_value(key, value)?,
            "min_problems_attempted_to_win" => {
                self.min_problems_attempted_to_win = parse_value(key, value)?
            }
            "max_session_minutes" => self.max_session_minutes = parse_value(key, value)?,
            "default_game" => self.default_game = value.to_string(),
            "route_through_scheduler" => self.route_through_scheduler = parse_value(key, value)?,
            other => {
                return Err(DrillError::InvalidConfig(format!(
                    "unknown config key {other}; expected one of {}",
                    Self::KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("mathdrill_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable config");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
