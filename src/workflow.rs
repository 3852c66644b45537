//! Workflow engine: file creation (including backdated history),
//! transactional step advancement and step comments.

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};

use crate::catalog::TERMINAL_STEP_NAME;
use crate::db::repository::{file, is_unique_violation, officer, process, step_log};
use crate::db::{DatabaseError, Db};
use crate::error::TrackerError;
use crate::models::{FileDetail, FileFilter, FileRecord, FileStatus, FileView, StepLogEntry};
use crate::sla;

/// Input for creating a tracked file. `assigned_date` accepts either a
/// date (`YYYY-MM-DD`) or a full timestamp; `current_step_order`
/// backdates the file partway through its process.
#[derive(Debug, Clone)]
pub struct CreateFileRequest {
    pub pr_number: String,
    pub title: String,
    pub process_name: String,
    pub officer_id: i64,
    pub assigned_date: Option<String>,
    pub current_step_order: Option<i64>,
}

pub struct WorkflowEngine {
    db: Db,
}

impl WorkflowEngine {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn create(&self, request: CreateFileRequest) -> Result<FileRecord, TrackerError> {
        self.create_at(request, Local::now().naive_local())
    }

    /// Create a file, optionally backdated partway through its
    /// process. All inserts (file row plus every synthesized and
    /// current step log entry) commit as one unit.
    pub fn create_at(
        &self,
        request: CreateFileRequest,
        now: NaiveDateTime,
    ) -> Result<FileRecord, TrackerError> {
        validate_create(&request)?;
        let anchor = resolve_anchor(request.assigned_date.as_deref(), now)?;

        let conn = self.db.conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(DatabaseError::Sqlite)?;

        let steps = process::get_steps(&tx, &request.process_name)?;
        if steps.is_empty() {
            return Err(TrackerError::InvalidProcess(request.process_name));
        }

        if officer::get_officer(&tx, request.officer_id)?.is_none() {
            return Err(TrackerError::not_found("officer", request.officer_id));
        }

        let target_order = request.current_step_order.unwrap_or(1);
        let target = steps
            .iter()
            .find(|s| s.step_order == target_order)
            .ok_or_else(|| {
                TrackerError::Validation(format!(
                    "process '{}' has no step at order {target_order}",
                    request.process_name
                ))
            })?;

        // A backdated file's current step is treated as freshly started.
        let step_started_at = if target_order <= 1 { anchor } else { now };
        let terminal = target.step_name == TERMINAL_STEP_NAME;
        let (status, completed_at) = if terminal {
            (FileStatus::Completed, Some(step_started_at))
        } else {
            (FileStatus::Active, None)
        };

        let file_id = file::insert_file(
            &tx,
            &file::NewFile {
                pr_number: &request.pr_number,
                title: &request.title,
                process_name: &request.process_name,
                officer_id: request.officer_id,
                current_step_id: target.id,
                step_started_at,
                status,
                created_at: anchor,
                completed_at,
            },
        )
        .map_err(|e| match e {
            DatabaseError::Sqlite(ref se) if is_unique_violation(se) => {
                TrackerError::Conflict(format!("PR number already exists: {}", request.pr_number))
            }
            other => other.into(),
        })?;

        // Synthetic history for every step preceding the target: walk
        // forward from the anchor, each step consuming its SLA
        // allowance (minimum one day), recorded as met.
        let mut running = anchor;
        for step in steps.iter().filter(|s| s.step_order < target_order) {
            let started = running;
            running += Duration::days(step.sla_days.max(1));
            step_log::insert_closed_entry(&tx, file_id, step.id, started, running, Some(true))?;
        }

        if terminal {
            step_log::insert_closed_entry(
                &tx,
                file_id,
                target.id,
                step_started_at,
                step_started_at,
                Some(true),
            )?;
        } else {
            step_log::insert_open_entry(&tx, file_id, target.id, step_started_at)?;
        }

        tx.commit().map_err(DatabaseError::Sqlite)?;

        file::get_file(&conn, file_id)?
            .ok_or_else(|| TrackerError::not_found("file", file_id))
    }

    pub fn advance(&self, file_id: i64, comment: Option<&str>) -> Result<FileRecord, TrackerError> {
        self.advance_at(file_id, comment, Local::now().naive_local())
    }

    /// Move a file to its next step: close the open log entry, point
    /// the file at the next step and open its log entry, all in one
    /// transaction. Reaching the terminal step completes the file.
    pub fn advance_at(
        &self,
        file_id: i64,
        comment: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<FileRecord, TrackerError> {
        let conn = self.db.conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(DatabaseError::Sqlite)?;

        let record = file::get_file(&tx, file_id)?
            .ok_or_else(|| TrackerError::not_found("file", file_id))?;
        if record.status == FileStatus::Completed {
            return Err(TrackerError::InvalidState(
                "file is already completed".to_string(),
            ));
        }

        let current = process::get_step(&tx, record.current_step_id)?
            .ok_or_else(|| TrackerError::not_found("step", record.current_step_id))?;
        let next = process::get_step_at(&tx, &record.process_name, current.step_order + 1)?
            .ok_or_else(|| {
                TrackerError::InvalidState(format!(
                    "no step after '{}' in process '{}'",
                    current.step_name, record.process_name
                ))
            })?;

        let open = step_log::get_open_entry(&tx, file_id)?
            .ok_or_else(|| TrackerError::not_found("open step log", file_id))?;
        let met = sla::sla_met(open.started_at, now, current.sla_days);
        step_log::close_entry(&tx, file_id, open.step_id, now, met, comment)?;

        let terminal = next.step_name == TERMINAL_STEP_NAME;
        let (status, completed_at) = if terminal {
            (FileStatus::Completed, Some(now))
        } else {
            (FileStatus::Active, None)
        };
        file::update_file_step(&tx, file_id, next.id, now, status, completed_at)?;

        if terminal {
            step_log::insert_closed_entry(&tx, file_id, next.id, now, now, None)?;
        } else {
            step_log::insert_open_entry(&tx, file_id, next.id, now)?;
        }

        tx.commit().map_err(DatabaseError::Sqlite)?;

        file::get_file(&conn, file_id)?
            .ok_or_else(|| TrackerError::not_found("file", file_id))
    }

    /// Overwrite the comment on one log entry of one file.
    pub fn set_step_comment(
        &self,
        file_id: i64,
        log_id: i64,
        comment: &str,
    ) -> Result<StepLogEntry, TrackerError> {
        let conn = self.db.conn()?;
        if !step_log::set_comment(&conn, file_id, log_id, comment)? {
            return Err(TrackerError::not_found("step log", log_id));
        }
        step_log::get_entry(&conn, file_id, log_id)?
            .ok_or_else(|| TrackerError::not_found("step log", log_id))
    }

    pub fn get_file(&self, file_id: i64) -> Result<FileDetail, TrackerError> {
        self.get_file_at(file_id, Local::now().naive_local())
    }

    /// Full detail for one file: annotated view, process steps and
    /// traversal history.
    pub fn get_file_at(&self, file_id: i64, now: NaiveDateTime) -> Result<FileDetail, TrackerError> {
        let conn = self.db.conn()?;
        let mut view = file::get_file_view(&conn, file_id)?
            .ok_or_else(|| TrackerError::not_found("file", file_id))?;
        sla::annotate(&mut view, now);

        let steps = process::get_steps(&conn, &view.file.process_name)?;
        let step_log = step_log::get_history(&conn, file_id)?;

        Ok(FileDetail {
            file: view,
            steps,
            step_log,
        })
    }

    pub fn list_files(&self, filter: &FileFilter) -> Result<Vec<FileView>, TrackerError> {
        self.list_files_at(filter, Local::now().naive_local())
    }

    pub fn list_files_at(
        &self,
        filter: &FileFilter,
        now: NaiveDateTime,
    ) -> Result<Vec<FileView>, TrackerError> {
        let conn = self.db.conn()?;
        let mut views = file::list_file_views(&conn, filter)?;
        for view in &mut views {
            sla::annotate(view, now);
        }
        Ok(views)
    }
}

fn validate_create(request: &CreateFileRequest) -> Result<(), TrackerError> {
    if request.pr_number.trim().is_empty()
        || request.title.trim().is_empty()
        || request.process_name.trim().is_empty()
        || request.officer_id <= 0
    {
        return Err(TrackerError::Validation(
            "pr_number, title, process_name and officer_id are required".to_string(),
        ));
    }
    Ok(())
}

/// Resolve the creation anchor. A date-only value is interpreted at
/// local noon so the deadline cannot slip to the previous calendar day
/// under negative UTC offsets; a full timestamp is used verbatim;
/// absent input means now.
fn resolve_anchor(assigned_date: Option<&str>, now: NaiveDateTime) -> Result<NaiveDateTime, TrackerError> {
    let Some(raw) = assigned_date else {
        return Ok(now);
    };
    let raw = raw.trim();

    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
    {
        return Ok(ts);
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.and_hms_opt(12, 0, 0).expect("noon is a valid time"))
        .map_err(|_| TrackerError::Validation(format!("unparseable assigned_date: {raw}")))
}
