use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

use super::{fmt_ts, parse_ts, DatabaseError};
use crate::models::Notification;

/// Insert-or-ignore a notification keyed by (file, step). A racing
/// insert that loses to the unique constraint is reported as `false`,
/// never an error — another caller already recorded the same fact.
pub fn insert_if_absent(
    conn: &Connection,
    file_id: i64,
    officer_id: i64,
    step_id: i64,
    message: &str,
    created_at: NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO notifications (file_id, officer_id, step_id, message, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![file_id, officer_id, step_id, message, fmt_ts(created_at)],
    )?;
    Ok(inserted > 0)
}

pub fn exists(conn: &Connection, file_id: i64, step_id: i64) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE file_id = ?1 AND step_id = ?2",
        params![file_id, step_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Notifications, optionally scoped to one officer and/or unread
/// only. Newest first, capped at 100.
pub fn list(
    conn: &Connection,
    officer_id: Option<i64>,
    unread_only: bool,
) -> Result<Vec<Notification>, DatabaseError> {
    let mut conditions: Vec<String> = Vec::new();
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(oid) = officer_id {
        params_vec.push(Box::new(oid));
        conditions.push(format!("officer_id = ?{}", params_vec.len()));
    }
    if unread_only {
        conditions.push("is_read = 0".to_string());
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let mut stmt = conn.prepare(&format!(
        "SELECT id, file_id, officer_id, step_id, message, is_read, created_at
         FROM notifications {where_clause}
         ORDER BY created_at DESC LIMIT 100"
    ))?;

    let param_refs: Vec<&dyn rusqlite::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(param_refs.as_slice(), |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, i32>(5)?,
            row.get::<_, String>(6)?,
        ))
    })?;

    let mut notifications = Vec::new();
    for row in rows {
        let (id, file_id, officer_id, step_id, message, is_read, created_at) = row?;
        notifications.push(Notification {
            id,
            file_id,
            officer_id,
            step_id,
            message,
            is_read: is_read != 0,
            created_at: parse_ts(&created_at)?,
        });
    }
    Ok(notifications)
}

pub fn unread_count(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE is_read = 0",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn mark_read(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE id = ?1",
        params![id],
    )?;
    Ok(changed > 0)
}

pub fn mark_all_read(conn: &Connection) -> Result<i64, DatabaseError> {
    let changed = conn.execute("UPDATE notifications SET is_read = 1 WHERE is_read = 0", [])?;
    Ok(changed as i64)
}
