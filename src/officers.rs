//! Officer directory: the people files are assigned to.

use chrono::Local;

use crate::db::repository::{is_unique_violation, officer};
use crate::db::{DatabaseError, Db};
use crate::error::TrackerError;
use crate::models::{Officer, OfficerSummary};

pub struct OfficerDirectory {
    db: Db,
}

impl OfficerDirectory {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Register an officer. Email must be unique.
    pub fn create(&self, name: &str, email: &str) -> Result<Officer, TrackerError> {
        if name.trim().is_empty() || email.trim().is_empty() {
            return Err(TrackerError::Validation(
                "name and email are required".to_string(),
            ));
        }

        let conn = self.db.conn()?;
        let id = officer::insert_officer(&conn, name, email, Local::now().naive_local())
            .map_err(|e| match e {
                DatabaseError::Sqlite(ref se) if is_unique_violation(se) => {
                    TrackerError::Conflict(format!("email already exists: {email}"))
                }
                other => other.into(),
            })?;

        officer::get_officer(&conn, id)?
            .ok_or_else(|| TrackerError::not_found("officer", id))
    }

    pub fn get(&self, id: i64) -> Result<Officer, TrackerError> {
        let conn = self.db.conn()?;
        officer::get_officer(&conn, id)?
            .ok_or_else(|| TrackerError::not_found("officer", id))
    }

    /// All officers with workload counts, ordered by name.
    pub fn list(&self) -> Result<Vec<OfficerSummary>, TrackerError> {
        let conn = self.db.conn()?;
        Ok(officer::list_officers(&conn)?)
    }

    /// Remove an officer. Refused while any file is still assigned;
    /// reassign via transfer first.
    pub fn remove(&self, id: i64) -> Result<(), TrackerError> {
        let conn = self.db.conn()?;
        if officer::get_officer(&conn, id)?.is_none() {
            return Err(TrackerError::not_found("officer", id));
        }
        if officer::count_assigned_files(&conn, id)? > 0 {
            return Err(TrackerError::InvalidState(
                "cannot delete an officer with assigned files".to_string(),
            ));
        }
        officer::delete_officer(&conn, id)?;
        Ok(())
    }
}
