use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

use super::{fmt_ts, parse_ts, DatabaseError};
use crate::models::{Officer, OfficerSummary};

pub fn insert_officer(
    conn: &Connection,
    name: &str,
    email: &str,
    created_at: NaiveDateTime,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO officers (name, email, created_at) VALUES (?1, ?2, ?3)",
        params![name, email, fmt_ts(created_at)],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_officer(conn: &Connection, id: i64) -> Result<Option<Officer>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, name, email, created_at FROM officers WHERE id = ?1",
        params![id],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        },
    );

    match result {
        Ok((id, name, email, created_at)) => Ok(Some(Officer {
            id,
            name,
            email,
            created_at: parse_ts(&created_at)?,
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All officers with their file workload counts, ordered by name.
pub fn list_officers(conn: &Connection) -> Result<Vec<OfficerSummary>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT o.id, o.name, o.email, o.created_at,
                (SELECT COUNT(*) FROM files f WHERE f.officer_id = o.id) AS file_count,
                (SELECT COUNT(*) FROM files f WHERE f.officer_id = o.id AND f.status = 'Active') AS active_count,
                (SELECT COUNT(*) FROM files f WHERE f.officer_id = o.id AND f.status = 'Completed') AS completed_count
         FROM officers o ORDER BY o.name",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, i64>(4)?,
            row.get::<_, i64>(5)?,
            row.get::<_, i64>(6)?,
        ))
    })?;

    let mut officers = Vec::new();
    for row in rows {
        let (id, name, email, created_at, file_count, active_count, completed_count) = row?;
        officers.push(OfficerSummary {
            officer: Officer {
                id,
                name,
                email,
                created_at: parse_ts(&created_at)?,
            },
            file_count,
            active_count,
            completed_count,
        });
    }
    Ok(officers)
}

pub fn count_assigned_files(conn: &Connection, officer_id: i64) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM files WHERE officer_id = ?1",
        params![officer_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn delete_officer(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    conn.execute("DELETE FROM officers WHERE id = ?1", params![id])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn ts(s: &str) -> NaiveDateTime {
        parse_ts(s).unwrap()
    }

    #[test]
    fn insert_and_get_officer() {
        let conn = open_memory_database().unwrap();
        let id = insert_officer(&conn, "Amina Diallo", "amina@proc.gov", ts("2026-01-05 08:00:00")).unwrap();

        let officer = get_officer(&conn, id).unwrap().unwrap();
        assert_eq!(officer.name, "Amina Diallo");
        assert_eq!(officer.email, "amina@proc.gov");
    }

    #[test]
    fn missing_officer_is_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_officer(&conn, 42).unwrap().is_none());
    }

    #[test]
    fn duplicate_email_rejected() {
        let conn = open_memory_database().unwrap();
        insert_officer(&conn, "A", "dup@proc.gov", ts("2026-01-05 08:00:00")).unwrap();
        let result = insert_officer(&conn, "B", "dup@proc.gov", ts("2026-01-06 08:00:00"));
        assert!(result.is_err());
    }

    #[test]
    fn list_is_ordered_by_name_with_counts() {
        let conn = open_memory_database().unwrap();
        insert_officer(&conn, "Zainab", "z@proc.gov", ts("2026-01-05 08:00:00")).unwrap();
        insert_officer(&conn, "Amina", "a@proc.gov", ts("2026-01-05 08:00:00")).unwrap();

        let officers = list_officers(&conn).unwrap();
        assert_eq!(officers.len(), 2);
        assert_eq!(officers[0].officer.name, "Amina");
        assert_eq!(officers[0].file_count, 0);
    }
}
