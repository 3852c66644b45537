pub mod enums;

pub use enums::FileStatus;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A named procurement process (reference data).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessDefinition {
    pub name: String,
    pub description: Option<String>,
}

/// One ordered stage of a process. `sla_days` is the allowed dwell
/// time before the step is overdue; `cum_days` the running total up to
/// and including this step. The step named `Completed` is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepTemplate {
    pub id: i64,
    pub process_name: String,
    pub step_order: i64,
    pub step_name: String,
    pub sla_days: i64,
    pub cum_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Officer {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: NaiveDateTime,
}

/// Officer with file workload counts, for directory listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfficerSummary {
    pub officer: Officer,
    pub file_count: i64,
    pub active_count: i64,
    pub completed_count: i64,
}

/// One tracked procurement file progressing through a process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    pub pr_number: String,
    pub title: String,
    pub process_name: String,
    pub officer_id: i64,
    pub current_step_id: i64,
    pub step_started_at: NaiveDateTime,
    pub status: FileStatus,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

/// File joined with officer and current-step metadata, annotated with
/// the shared deadline computation. What list views render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileView {
    #[serde(flatten)]
    pub file: FileRecord,
    pub officer_name: String,
    pub officer_email: String,
    pub current_step_name: String,
    pub step_order: i64,
    pub sla_days: i64,
    pub total_steps: i64,
    pub deadline: Option<NaiveDateTime>,
    pub is_overdue: bool,
}

/// Append-only record of one traversal of one step by one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepLogEntry {
    pub id: i64,
    pub file_id: i64,
    pub step_id: i64,
    pub started_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
    pub sla_met: Option<bool>,
    pub comment: Option<String>,
}

/// Log entry joined with its step template, for history display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepLogView {
    #[serde(flatten)]
    pub entry: StepLogEntry,
    pub step_name: String,
    pub step_order: i64,
    pub sla_days: i64,
}

/// Full file detail: annotated file, the process step list and the
/// traversal history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDetail {
    pub file: FileView,
    pub steps: Vec<StepTemplate>,
    pub step_log: Vec<StepLogView>,
}

/// Overdue notification, deduplicated per (file, step).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub file_id: i64,
    pub officer_id: i64,
    pub step_id: i64,
    pub message: String,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}

/// Filters for file listings. All fields optional, ANDed together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileFilter {
    pub officer_id: Option<i64>,
    pub status: Option<FileStatus>,
    pub process_name: Option<String>,
}
