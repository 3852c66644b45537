use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

use super::{fmt_ts, parse_opt_ts, parse_ts, DatabaseError};
use crate::models::{StepLogEntry, StepLogView};

const LOG_COLS: &str = "id, file_id, step_id, started_at, completed_at, sla_met, comment";

/// Insert an open log entry (traversal in progress).
pub fn insert_open_entry(
    conn: &Connection,
    file_id: i64,
    step_id: i64,
    started_at: NaiveDateTime,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO file_step_log (file_id, step_id, started_at) VALUES (?1, ?2, ?3)",
        params![file_id, step_id, fmt_ts(started_at)],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Insert an already-closed log entry (synthetic backfill, or the
/// terminal step which completes the moment it opens).
pub fn insert_closed_entry(
    conn: &Connection,
    file_id: i64,
    step_id: i64,
    started_at: NaiveDateTime,
    completed_at: NaiveDateTime,
    sla_met: Option<bool>,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO file_step_log (file_id, step_id, started_at, completed_at, sla_met)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            file_id,
            step_id,
            fmt_ts(started_at),
            fmt_ts(completed_at),
            sla_met.map(|b| b as i32),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// The single open entry for a file, if any.
pub fn get_open_entry(conn: &Connection, file_id: i64) -> Result<Option<StepLogEntry>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {LOG_COLS} FROM file_step_log WHERE file_id = ?1 AND completed_at IS NULL"),
        params![file_id],
        log_row,
    );

    match result {
        Ok(row) => Ok(Some(entry_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Close the open entry for (file, step). The comment is overwritten
/// only when one is supplied. Returns false if no open row matched.
pub fn close_entry(
    conn: &Connection,
    file_id: i64,
    step_id: i64,
    completed_at: NaiveDateTime,
    sla_met: bool,
    comment: Option<&str>,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE file_step_log
         SET completed_at = ?1, sla_met = ?2, comment = COALESCE(?3, comment)
         WHERE file_id = ?4 AND step_id = ?5 AND completed_at IS NULL",
        params![fmt_ts(completed_at), sla_met as i32, comment, file_id, step_id],
    )?;
    Ok(changed > 0)
}

/// Overwrite the comment on the entry identified by (file, log id).
/// Returns false if the pair matches no row.
pub fn set_comment(
    conn: &Connection,
    file_id: i64,
    log_id: i64,
    comment: &str,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE file_step_log SET comment = ?1 WHERE id = ?2 AND file_id = ?3",
        params![comment, log_id, file_id],
    )?;
    Ok(changed > 0)
}

pub fn get_entry(
    conn: &Connection,
    file_id: i64,
    log_id: i64,
) -> Result<Option<StepLogEntry>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {LOG_COLS} FROM file_step_log WHERE id = ?1 AND file_id = ?2"),
        params![log_id, file_id],
        log_row,
    );

    match result {
        Ok(row) => Ok(Some(entry_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Full traversal history of a file in process order, joined with
/// step metadata.
pub fn get_history(conn: &Connection, file_id: i64) -> Result<Vec<StepLogView>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT fsl.id, fsl.file_id, fsl.step_id, fsl.started_at, fsl.completed_at,
                fsl.sla_met, fsl.comment, ps.step_name, ps.step_order, ps.sla_days
         FROM file_step_log fsl
         JOIN process_steps ps ON ps.id = fsl.step_id
         WHERE fsl.file_id = ?1
         ORDER BY ps.step_order",
    )?;

    let rows = stmt.query_map(params![file_id], |row| {
        Ok((
            log_row(row)?,
            row.get::<_, String>(7)?,
            row.get::<_, i64>(8)?,
            row.get::<_, i64>(9)?,
        ))
    })?;

    let mut history = Vec::new();
    for row in rows {
        let (raw, step_name, step_order, sla_days) = row?;
        history.push(StepLogView {
            entry: entry_from_row(raw)?,
            step_name,
            step_order,
            sla_days,
        });
    }
    Ok(history)
}

// Internal row type for StepLogEntry mapping
struct LogRow {
    id: i64,
    file_id: i64,
    step_id: i64,
    started_at: String,
    completed_at: Option<String>,
    sla_met: Option<i32>,
    comment: Option<String>,
}

fn log_row(row: &rusqlite::Row<'_>) -> Result<LogRow, rusqlite::Error> {
    Ok(LogRow {
        id: row.get(0)?,
        file_id: row.get(1)?,
        step_id: row.get(2)?,
        started_at: row.get(3)?,
        completed_at: row.get(4)?,
        sla_met: row.get(5)?,
        comment: row.get(6)?,
    })
}

fn entry_from_row(row: LogRow) -> Result<StepLogEntry, DatabaseError> {
    Ok(StepLogEntry {
        id: row.id,
        file_id: row.file_id,
        step_id: row.step_id,
        started_at: parse_ts(&row.started_at)?,
        completed_at: parse_opt_ts(row.completed_at)?,
        sla_met: row.sla_met.map(|v| v != 0),
        comment: row.comment,
    })
}
