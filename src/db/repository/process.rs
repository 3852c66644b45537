use rusqlite::{params, Connection};

use super::DatabaseError;
use crate::models::{ProcessDefinition, StepTemplate};

const STEP_COLS: &str = "id, process_name, step_order, step_name, sla_days, cum_days";

pub fn get_processes(conn: &Connection) -> Result<Vec<ProcessDefinition>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT name, description FROM processes ORDER BY name")?;
    let rows = stmt.query_map([], |row| {
        Ok(ProcessDefinition {
            name: row.get(0)?,
            description: row.get(1)?,
        })
    })?;

    let mut processes = Vec::new();
    for row in rows {
        processes.push(row?);
    }
    Ok(processes)
}

/// All steps of a process in step_order. Empty vec if the process is
/// unknown; callers decide whether that is an error.
pub fn get_steps(conn: &Connection, process_name: &str) -> Result<Vec<StepTemplate>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {STEP_COLS} FROM process_steps WHERE process_name = ?1 ORDER BY step_order"
    ))?;
    let rows = stmt.query_map(params![process_name], step_from_row)?;

    let mut steps = Vec::new();
    for row in rows {
        steps.push(row?);
    }
    Ok(steps)
}

pub fn get_step(conn: &Connection, step_id: i64) -> Result<Option<StepTemplate>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {STEP_COLS} FROM process_steps WHERE id = ?1"),
        params![step_id],
        step_from_row,
    );

    match result {
        Ok(step) => Ok(Some(step)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// The step of a process at a given order, if any.
pub fn get_step_at(
    conn: &Connection,
    process_name: &str,
    step_order: i64,
) -> Result<Option<StepTemplate>, DatabaseError> {
    let result = conn.query_row(
        &format!(
            "SELECT {STEP_COLS} FROM process_steps
             WHERE process_name = ?1 AND step_order = ?2"
        ),
        params![process_name, step_order],
        step_from_row,
    );

    match result {
        Ok(step) => Ok(Some(step)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn step_from_row(row: &rusqlite::Row<'_>) -> Result<StepTemplate, rusqlite::Error> {
    Ok(StepTemplate {
        id: row.get(0)?,
        process_name: row.get(1)?,
        step_order: row.get(2)?,
        step_name: row.get(3)?,
        sla_days: row.get(4)?,
        cum_days: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn seeded_steps_come_back_ordered() {
        let conn = open_memory_database().unwrap();
        let steps = get_steps(&conn, "Sole Source").unwrap();
        assert_eq!(steps.len(), 5);
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step.step_order, i as i64 + 1);
        }
        assert_eq!(steps.last().unwrap().step_name, "Completed");
    }

    #[test]
    fn unknown_process_yields_empty() {
        let conn = open_memory_database().unwrap();
        let steps = get_steps(&conn, "Direct Award").unwrap();
        assert!(steps.is_empty());
    }

    #[test]
    fn get_step_at_finds_exact_order() {
        let conn = open_memory_database().unwrap();
        let step = get_step_at(&conn, "Sole Source", 2).unwrap().unwrap();
        assert_eq!(step.step_name, "Justification Review");
        assert_eq!(step.sla_days, 3);

        assert!(get_step_at(&conn, "Sole Source", 99).unwrap().is_none());
    }

    #[test]
    fn lists_all_seeded_processes() {
        let conn = open_memory_database().unwrap();
        let names: Vec<String> = get_processes(&conn)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(
            names,
            vec!["Open Tender", "Request for Quotation", "Sole Source"]
        );
    }
}
