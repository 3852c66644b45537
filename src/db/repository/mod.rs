//! Repository functions over the raw connection. Each submodule owns
//! the row mapping for one table; engines compose these inside
//! transactions.

pub mod file;
pub mod notification;
pub mod officer;
pub mod process;
pub mod step_log;

use chrono::NaiveDateTime;
use rusqlite::Error as SqlError;

use super::DatabaseError;

pub(crate) const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a timestamp for storage.
pub(crate) fn fmt_ts(ts: NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

/// Parse a stored timestamp, tolerating the `T` separator.
pub(crate) fn parse_ts(s: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| DatabaseError::ConstraintViolation(format!("Bad timestamp '{s}': {e}")))
}

pub(crate) fn parse_opt_ts(s: Option<String>) -> Result<Option<NaiveDateTime>, DatabaseError> {
    s.map(|v| parse_ts(&v)).transpose()
}

/// Whether an insert failed on a UNIQUE constraint (as opposed to any
/// other SQLite error). Used to translate duplicates into Conflict.
pub(crate) fn is_unique_violation(e: &SqlError) -> bool {
    matches!(
        e,
        SqlError::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ts_accepts_both_separators() {
        assert_eq!(
            parse_ts("2026-03-01 09:30:00").unwrap(),
            parse_ts("2026-03-01T09:30:00").unwrap()
        );
    }

    #[test]
    fn parse_ts_rejects_garbage() {
        assert!(parse_ts("yesterday").is_err());
    }

    #[test]
    fn fmt_parse_round_trip() {
        let ts = parse_ts("2026-03-01 09:30:00").unwrap();
        assert_eq!(fmt_ts(ts), "2026-03-01 09:30:00");
    }
}
