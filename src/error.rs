//! Crate-level error taxonomy shared by all engine components.
//!
//! Validation / Conflict / NotFound / InvalidState propagate to the
//! caller unchanged; a Conflict arising from a racing notification
//! insert is swallowed inside the SLA monitor and never surfaces.

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Unknown process or process has no steps: {0}")]
    InvalidProcess(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl TrackerError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<rusqlite::Error> for TrackerError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(DatabaseError::Sqlite(e))
    }
}
