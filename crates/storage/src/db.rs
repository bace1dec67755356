// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed event store.
//!
//! One connection per store instance, guarded by a mutex, so all writes are
//! serialized by construction. WAL journaling lets concurrent readers (other
//! processes) proceed while a tick writes.

use crate::{migrations, StoreError};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

/// Durable log of session events, check runs, pipeline events, and the
/// issue queue.
pub struct EventStore {
    pub(crate) conn: Mutex<Connection>,
}

impl EventStore {
    /// Open (creating if needed) the store at the given path and apply
    /// pending migrations.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        migrations::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        migrations::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn configure(conn: &Connection) -> Result<(), StoreError> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "busy_timeout", 5_000)?;
        Ok(())
    }

    /// Re-apply migrations; a no-op when the schema is current.
    pub fn migrate(&self) -> Result<(), StoreError> {
        migrations::migrate(&self.conn.lock())
    }

    /// Drop and re-create every table.
    pub fn reset(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        for table in migrations::TABLES {
            conn.execute_batch(&format!("DROP TABLE IF EXISTS {table}"))?;
        }
        migrations::migrate(&conn)
    }

    /// Current schema version (0 before any migration).
    pub fn schema_version(&self) -> Result<u32, StoreError> {
        let conn = self.conn.lock();
        let version = conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )?;
        Ok(version)
    }
}

/// Convert a stored millisecond timestamp back to a DateTime.
pub(crate) fn ms_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
