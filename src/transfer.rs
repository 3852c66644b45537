//! Officer-to-officer transfer of in-flight files.
//!
//! Batch semantics are best-effort against a possibly stale snapshot:
//! each file is handed off with a conditional update, and rows already
//! moved or completed are silently skipped rather than failing the
//! batch. Results come back grouped by destination officer so the
//! caller can compose handover mail.

use serde::{Deserialize, Serialize};

use crate::db::repository::{file, officer};
use crate::db::Db;
use crate::error::TrackerError;
use crate::models::Officer;

/// One requested handoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub file_id: i64,
    pub to_officer_id: i64,
}

/// A file that actually changed hands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferredFile {
    pub file_id: i64,
    pub pr_number: String,
    pub title: String,
    pub process_name: String,
    pub to_officer_id: i64,
}

/// Transfers bound for one destination officer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfficerTransfers {
    pub to_officer: Officer,
    pub files: Vec<TransferredFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub from_officer: Officer,
    pub transferred_count: usize,
    pub grouped: Vec<OfficerTransfers>,
}

pub struct TransferCoordinator {
    db: Db,
}

impl TransferCoordinator {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Reassign a batch of files away from one officer. Fails only if
    /// the source officer does not exist; individual files that no
    /// longer belong to the source, are completed, or target the same
    /// officer are skipped without error.
    pub fn transfer(
        &self,
        from_officer_id: i64,
        transfers: &[TransferRequest],
    ) -> Result<TransferOutcome, TrackerError> {
        let conn = self.db.conn()?;

        let from_officer = officer::get_officer(&conn, from_officer_id)?
            .ok_or_else(|| TrackerError::not_found("officer", from_officer_id))?;

        let mut moved: Vec<TransferredFile> = Vec::new();
        for t in transfers {
            if t.to_officer_id == from_officer_id {
                continue;
            }

            // Conditional handoff: only while still owned and Active.
            match file::reassign_file(&conn, t.file_id, from_officer_id, t.to_officer_id)? {
                Some(reassigned) => moved.push(TransferredFile {
                    file_id: reassigned.file_id,
                    pr_number: reassigned.pr_number,
                    title: reassigned.title,
                    process_name: reassigned.process_name,
                    to_officer_id: t.to_officer_id,
                }),
                None => {
                    tracing::debug!(
                        "Skipping transfer of file {}: no longer active under officer {}",
                        t.file_id,
                        from_officer_id
                    );
                }
            }
        }

        // Group by destination for handover notifications.
        let mut grouped: Vec<OfficerTransfers> = Vec::new();
        for file in &moved {
            match grouped.iter_mut().find(|g| g.to_officer.id == file.to_officer_id) {
                Some(group) => group.files.push(file.clone()),
                None => {
                    let to_officer = officer::get_officer(&conn, file.to_officer_id)?
                        .ok_or_else(|| TrackerError::not_found("officer", file.to_officer_id))?;
                    grouped.push(OfficerTransfers {
                        to_officer,
                        files: vec![file.clone()],
                    });
                }
            }
        }

        tracing::info!(
            "Transferred {} file(s) away from officer {}",
            moved.len(),
            from_officer_id
        );

        Ok(TransferOutcome {
            from_officer,
            transferred_count: moved.len(),
            grouped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::parse_ts;
    use crate::db::sqlite::open_memory_database;
    use crate::models::FileStatus;
    use crate::workflow::{CreateFileRequest, WorkflowEngine};
    use chrono::NaiveDateTime;
    use rusqlite::params;

    fn ts(s: &str) -> NaiveDateTime {
        parse_ts(s).unwrap()
    }

    fn setup() -> (Db, WorkflowEngine, TransferCoordinator) {
        let db = Db::new(open_memory_database().unwrap());
        {
            let conn = db.conn().unwrap();
            for (name, email) in [
                ("Amina", "amina@proc.gov"),
                ("Brook", "brook@proc.gov"),
                ("Chidi", "chidi@proc.gov"),
            ] {
                conn.execute(
                    "INSERT INTO officers (name, email, created_at) VALUES (?1, ?2, '2026-01-01 08:00:00')",
                    params![name, email],
                )
                .unwrap();
            }
        }
        (db.clone(), WorkflowEngine::new(db.clone()), TransferCoordinator::new(db))
    }

    fn create_file(engine: &WorkflowEngine, pr: &str, officer_id: i64) -> i64 {
        engine
            .create_at(
                CreateFileRequest {
                    pr_number: pr.to_string(),
                    title: "Office chairs".to_string(),
                    process_name: "Sole Source".to_string(),
                    officer_id,
                    assigned_date: None,
                    current_step_order: None,
                },
                ts("2026-03-01 09:00:00"),
            )
            .unwrap()
            .id
    }

    fn owner_of(db: &Db, file_id: i64) -> i64 {
        db.conn()
            .unwrap()
            .query_row("SELECT officer_id FROM files WHERE id = ?1", [file_id], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn transfers_active_files_and_groups_by_destination() {
        let (db, engine, coordinator) = setup();
        let f1 = create_file(&engine, "PR-100", 1);
        let f2 = create_file(&engine, "PR-101", 1);
        let f3 = create_file(&engine, "PR-102", 1);

        let outcome = coordinator
            .transfer(
                1,
                &[
                    TransferRequest { file_id: f1, to_officer_id: 2 },
                    TransferRequest { file_id: f2, to_officer_id: 2 },
                    TransferRequest { file_id: f3, to_officer_id: 3 },
                ],
            )
            .unwrap();

        assert_eq!(outcome.transferred_count, 3);
        assert_eq!(outcome.from_officer.name, "Amina");
        assert_eq!(outcome.grouped.len(), 2);

        let to_brook = outcome.grouped.iter().find(|g| g.to_officer.id == 2).unwrap();
        assert_eq!(to_brook.files.len(), 2);

        assert_eq!(owner_of(&db, f1), 2);
        assert_eq!(owner_of(&db, f3), 3);
    }

    #[test]
    fn missing_source_officer_is_not_found() {
        let (_db, _engine, coordinator) = setup();
        let result = coordinator.transfer(99, &[]);
        assert!(matches!(result, Err(TrackerError::NotFound { .. })));
    }

    #[test]
    fn same_officer_pair_is_skipped() {
        let (db, engine, coordinator) = setup();
        let f1 = create_file(&engine, "PR-100", 1);

        let outcome = coordinator
            .transfer(1, &[TransferRequest { file_id: f1, to_officer_id: 1 }])
            .unwrap();

        assert_eq!(outcome.transferred_count, 0);
        assert!(outcome.grouped.is_empty());
        assert_eq!(owner_of(&db, f1), 1);
    }

    #[test]
    fn file_owned_by_someone_else_is_skipped() {
        let (db, engine, coordinator) = setup();
        let f1 = create_file(&engine, "PR-100", 3); // belongs to Chidi

        let outcome = coordinator
            .transfer(1, &[TransferRequest { file_id: f1, to_officer_id: 2 }])
            .unwrap();

        assert_eq!(outcome.transferred_count, 0);
        assert_eq!(owner_of(&db, f1), 3);
    }

    #[test]
    fn completed_file_is_skipped() {
        let (db, engine, coordinator) = setup();
        let f1 = create_file(&engine, "PR-100", 1);
        let mut clock = ts("2026-03-01 10:00:00");
        for _ in 0..4 {
            engine.advance_at(f1, None, clock).unwrap();
            clock += chrono::Duration::hours(1);
        }
        let status: String = db
            .conn()
            .unwrap()
            .query_row("SELECT status FROM files WHERE id = ?1", [f1], |row| row.get(0))
            .unwrap();
        assert_eq!(status, FileStatus::Completed.as_str());

        let outcome = coordinator
            .transfer(1, &[TransferRequest { file_id: f1, to_officer_id: 2 }])
            .unwrap();

        assert_eq!(outcome.transferred_count, 0);
        assert_eq!(owner_of(&db, f1), 1);
    }

    #[test]
    fn partial_batch_succeeds() {
        let (db, engine, coordinator) = setup();
        let good = create_file(&engine, "PR-100", 1);
        let stale = create_file(&engine, "PR-101", 2); // not Amina's

        let outcome = coordinator
            .transfer(
                1,
                &[
                    TransferRequest { file_id: good, to_officer_id: 3 },
                    TransferRequest { file_id: stale, to_officer_id: 3 },
                    TransferRequest { file_id: 404, to_officer_id: 3 },
                ],
            )
            .unwrap();

        assert_eq!(outcome.transferred_count, 1);
        assert_eq!(outcome.grouped[0].files[0].pr_number, "PR-100");
        assert_eq!(owner_of(&db, good), 3);
        assert_eq!(owner_of(&db, stale), 2);
    }

    #[test]
    fn transfer_is_idempotent_against_stale_view() {
        let (db, engine, coordinator) = setup();
        let f1 = create_file(&engine, "PR-100", 1);
        let req = [TransferRequest { file_id: f1, to_officer_id: 2 }];

        let first = coordinator.transfer(1, &req).unwrap();
        assert_eq!(first.transferred_count, 1);

        // Replaying the same batch finds nothing left to move
        let second = coordinator.transfer(1, &req).unwrap();
        assert_eq!(second.transferred_count, 0);
        assert_eq!(owner_of(&db, f1), 2);
    }
}
