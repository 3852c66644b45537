use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

use super::{fmt_ts, parse_opt_ts, parse_ts, DatabaseError};
use crate::models::{FileFilter, FileRecord, FileStatus, FileView};

const FILE_COLS: &str = "id, pr_number, title, process_name, officer_id, current_step_id,
     step_started_at, status, created_at, completed_at";

pub struct NewFile<'a> {
    pub pr_number: &'a str,
    pub title: &'a str,
    pub process_name: &'a str,
    pub officer_id: i64,
    pub current_step_id: i64,
    pub step_started_at: NaiveDateTime,
    pub status: FileStatus,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

pub fn insert_file(conn: &Connection, file: &NewFile<'_>) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO files (pr_number, title, process_name, officer_id, current_step_id,
         step_started_at, status, created_at, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            file.pr_number,
            file.title,
            file.process_name,
            file.officer_id,
            file.current_step_id,
            fmt_ts(file.step_started_at),
            file.status.as_str(),
            fmt_ts(file.created_at),
            file.completed_at.map(fmt_ts),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_file(conn: &Connection, id: i64) -> Result<Option<FileRecord>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {FILE_COLS} FROM files WHERE id = ?1"),
        params![id],
        file_row,
    );

    match result {
        Ok(row) => Ok(Some(file_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// File joined with officer and current-step metadata. The overdue
/// annotation is filled in by the caller against its own clock.
pub fn get_file_view(conn: &Connection, id: i64) -> Result<Option<FileView>, DatabaseError> {
    let mut views = query_views(conn, "WHERE f.id = ?1", &[&id as &dyn rusqlite::ToSql])?;
    Ok(views.pop())
}

pub fn list_file_views(
    conn: &Connection,
    filter: &FileFilter,
) -> Result<Vec<FileView>, DatabaseError> {
    let mut conditions: Vec<String> = Vec::new();
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(officer_id) = filter.officer_id {
        params_vec.push(Box::new(officer_id));
        conditions.push(format!("f.officer_id = ?{}", params_vec.len()));
    }
    if let Some(status) = filter.status {
        params_vec.push(Box::new(status.as_str()));
        conditions.push(format!("f.status = ?{}", params_vec.len()));
    }
    if let Some(process_name) = &filter.process_name {
        params_vec.push(Box::new(process_name.clone()));
        conditions.push(format!("f.process_name = ?{}", params_vec.len()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let param_refs: Vec<&dyn rusqlite::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    query_views(conn, &where_clause, &param_refs)
}

fn query_views(
    conn: &Connection,
    where_clause: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<FileView>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT f.id, f.pr_number, f.title, f.process_name, f.officer_id, f.current_step_id,
                f.step_started_at, f.status, f.created_at, f.completed_at,
                o.name, o.email, ps.step_name, ps.step_order, ps.sla_days,
                (SELECT COUNT(*) FROM process_steps WHERE process_name = f.process_name)
         FROM files f
         JOIN officers o ON o.id = f.officer_id
         JOIN process_steps ps ON ps.id = f.current_step_id
         {where_clause}
         ORDER BY f.created_at DESC"
    ))?;

    let rows = stmt.query_map(params, |row| {
        Ok((
            file_row(row)?,
            row.get::<_, String>(10)?,
            row.get::<_, String>(11)?,
            row.get::<_, String>(12)?,
            row.get::<_, i64>(13)?,
            row.get::<_, i64>(14)?,
            row.get::<_, i64>(15)?,
        ))
    })?;

    let mut views = Vec::new();
    for row in rows {
        let (raw, officer_name, officer_email, current_step_name, step_order, sla_days, total_steps) =
            row?;
        views.push(FileView {
            file: file_from_row(raw)?,
            officer_name,
            officer_email,
            current_step_name,
            step_order,
            sla_days,
            total_steps,
            deadline: None,
            is_overdue: false,
        });
    }
    Ok(views)
}

/// Point the file at a new current step, updating status and
/// completion timestamps together.
pub fn update_file_step(
    conn: &Connection,
    file_id: i64,
    step_id: i64,
    step_started_at: NaiveDateTime,
    status: FileStatus,
    completed_at: Option<NaiveDateTime>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE files SET current_step_id = ?1, step_started_at = ?2, status = ?3, completed_at = ?4
         WHERE id = ?5",
        params![
            step_id,
            fmt_ts(step_started_at),
            status.as_str(),
            completed_at.map(fmt_ts),
            file_id,
        ],
    )?;
    Ok(())
}

/// Identifying fields of a file that just changed hands.
pub struct ReassignedFile {
    pub file_id: i64,
    pub pr_number: String,
    pub title: String,
    pub process_name: String,
}

/// Conditional ownership handoff: succeeds only while the file still
/// belongs to `from_officer_id` and is Active. A stale view (already
/// moved or completed) returns None, a silent no-op.
pub fn reassign_file(
    conn: &Connection,
    file_id: i64,
    from_officer_id: i64,
    to_officer_id: i64,
) -> Result<Option<ReassignedFile>, DatabaseError> {
    let result = conn.query_row(
        "UPDATE files SET officer_id = ?1
         WHERE id = ?2 AND officer_id = ?3 AND status = 'Active'
         RETURNING id, pr_number, title, process_name",
        params![to_officer_id, file_id, from_officer_id],
        |row| {
            Ok(ReassignedFile {
                file_id: row.get(0)?,
                pr_number: row.get(1)?,
                title: row.get(2)?,
                process_name: row.get(3)?,
            })
        },
    );

    match result {
        Ok(file) => Ok(Some(file)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// An active file whose current step has blown its SLA deadline.
pub struct OverdueFile {
    pub file_id: i64,
    pub pr_number: String,
    pub title: String,
    pub officer_id: i64,
    pub officer_name: String,
    pub current_step_id: i64,
    pub step_started_at: NaiveDateTime,
    pub step_name: String,
    pub sla_days: i64,
}

/// Active files with `sla_days > 0` whose deadline is strictly past
/// `now`. Zero-SLA steps never appear.
pub fn list_overdue(conn: &Connection, now: NaiveDateTime) -> Result<Vec<OverdueFile>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT f.id, f.pr_number, f.title, f.officer_id, o.name,
                f.current_step_id, f.step_started_at, ps.step_name, ps.sla_days
         FROM files f
         JOIN process_steps ps ON ps.id = f.current_step_id
         JOIN officers o ON o.id = f.officer_id
         WHERE f.status = 'Active'
           AND ps.sla_days > 0
           AND datetime(f.step_started_at, '+' || ps.sla_days || ' days') < datetime(?1)",
    )?;

    let rows = stmt.query_map(params![fmt_ts(now)], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, i64>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, String>(7)?,
            row.get::<_, i64>(8)?,
        ))
    })?;

    let mut overdue = Vec::new();
    for row in rows {
        let (file_id, pr_number, title, officer_id, officer_name, current_step_id, started, step_name, sla_days) =
            row?;
        overdue.push(OverdueFile {
            file_id,
            pr_number,
            title,
            officer_id,
            officer_name,
            current_step_id,
            step_started_at: parse_ts(&started)?,
            step_name,
            sla_days,
        });
    }
    Ok(overdue)
}

// Internal row type for FileRecord mapping
pub(crate) struct FileRow {
    id: i64,
    pr_number: String,
    title: String,
    process_name: String,
    officer_id: i64,
    current_step_id: i64,
    step_started_at: String,
    status: String,
    created_at: String,
    completed_at: Option<String>,
}

pub(crate) fn file_row(row: &rusqlite::Row<'_>) -> Result<FileRow, rusqlite::Error> {
    Ok(FileRow {
        id: row.get(0)?,
        pr_number: row.get(1)?,
        title: row.get(2)?,
        process_name: row.get(3)?,
        officer_id: row.get(4)?,
        current_step_id: row.get(5)?,
        step_started_at: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get(8)?,
        completed_at: row.get(9)?,
    })
}

pub(crate) fn file_from_row(row: FileRow) -> Result<FileRecord, DatabaseError> {
    Ok(FileRecord {
        id: row.id,
        pr_number: row.pr_number,
        title: row.title,
        process_name: row.process_name,
        officer_id: row.officer_id,
        current_step_id: row.current_step_id,
        step_started_at: parse_ts(&row.step_started_at)?,
        status: FileStatus::from_str(&row.status)?,
        created_at: parse_ts(&row.created_at)?,
        completed_at: parse_opt_ts(row.completed_at)?,
    })
}
