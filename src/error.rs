//! Error types shared by the drill engine, the assignment loader and the store.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DrillError {
    #[error("invalid generator configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown game type: {0}")]
    UnknownGame(String),

    #[error("assignment not found: {0}")]
    AssignmentNotFound(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, DrillError>;
