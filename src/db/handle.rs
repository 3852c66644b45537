//! Shared connection handle injected into each engine component.
//!
//! The process entrypoint opens the database and owns its lifecycle;
//! components receive a cloned `Db` at construction. The mutex
//! serializes access so multi-write transactions never interleave on
//! the same file row.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use super::DatabaseError;

/// Cloneable handle over a single SQLite connection.
#[derive(Clone)]
pub struct Db {
    inner: Arc<Mutex<Connection>>,
}

impl Db {
    pub fn new(conn: Connection) -> Self {
        Self {
            inner: Arc::new(Mutex::new(conn)),
        }
    }

    /// Acquire the connection. A poisoned lock surfaces as an error
    /// rather than a panic so callers can propagate it.
    pub fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.inner.lock().map_err(|_| DatabaseError::LockPoisoned)
    }
}
