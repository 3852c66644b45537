//! Read-only process catalog: named processes and their ordered step
//! templates. Seeded by migration, never mutated by the engine.

use crate::db::{repository::process, Db};
use crate::error::TrackerError;
use crate::models::{ProcessDefinition, StepTemplate};

/// Name of the terminal step that marks a file as completed.
pub const TERMINAL_STEP_NAME: &str = "Completed";

pub struct ProcessCatalog {
    db: Db,
}

impl ProcessCatalog {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn processes(&self) -> Result<Vec<ProcessDefinition>, TrackerError> {
        let conn = self.db.conn()?;
        Ok(process::get_processes(&conn)?)
    }

    /// Ordered steps of a process. Fails if the process is unknown or
    /// has zero steps.
    pub fn steps(&self, process_name: &str) -> Result<Vec<StepTemplate>, TrackerError> {
        let conn = self.db.conn()?;
        let steps = process::get_steps(&conn, process_name)?;
        if steps.is_empty() {
            return Err(TrackerError::InvalidProcess(process_name.to_string()));
        }
        Ok(steps)
    }
}
