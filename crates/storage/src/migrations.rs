// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Numbered schema migrations.
//!
//! Each migration is an idempotent SQL batch applied in order inside a
//! transaction, recording its version in `schema_version`. Re-running
//! `migrate` is a no-op once the store is current.

use crate::StoreError;
use rusqlite::Connection;

/// Ordered (version, sql) pairs. Append-only; never edit a shipped entry.
const MIGRATIONS: &[(u32, &str)] = &[
    (
        1,
        "CREATE TABLE IF NOT EXISTS session_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT NOT NULL,
            issue INTEGER NOT NULL,
            stage TEXT NOT NULL,
            event TEXT NOT NULL,
            exit_code INTEGER,
            timestamp INTEGER NOT NULL,
            metadata TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_session_events_session
            ON session_events(session_id, timestamp DESC);
        CREATE INDEX IF NOT EXISTS idx_session_events_issue
            ON session_events(issue, stage);",
    ),
    (
        2,
        "CREATE TABLE IF NOT EXISTS check_runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            issue INTEGER NOT NULL,
            stage TEXT NOT NULL,
            attempt INTEGER NOT NULL,
            fix_round INTEGER NOT NULL,
            check_name TEXT NOT NULL,
            passed INTEGER NOT NULL,
            auto_fixed INTEGER NOT NULL DEFAULT 0,
            exit_code INTEGER NOT NULL,
            duration_ms INTEGER NOT NULL,
            summary TEXT NOT NULL DEFAULT '',
            findings TEXT NOT NULL DEFAULT '',
            timestamp INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_check_runs_round
            ON check_runs(issue, stage, fix_round);
        CREATE INDEX IF NOT EXISTS idx_check_runs_latest
            ON check_runs(issue, stage, check_name, id DESC);",
    ),
    (
        3,
        "CREATE TABLE IF NOT EXISTS pipeline_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            issue INTEGER NOT NULL,
            event TEXT NOT NULL,
            stage TEXT,
            attempt INTEGER,
            detail TEXT,
            timestamp INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_pipeline_events_issue
            ON pipeline_events(issue, id);",
    ),
    (
        4,
        "CREATE TABLE IF NOT EXISTS queue (
            issue INTEGER PRIMARY KEY,
            position INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            feature_intent TEXT NOT NULL DEFAULT '',
            depends_on TEXT NOT NULL DEFAULT '[]',
            queued_at INTEGER NOT NULL,
            started_at INTEGER,
            finished_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_queue_status
            ON queue(status, position);",
    ),
];

/// Tables owned by the store, newest first (drop order for `reset`).
pub(crate) const TABLES: &[&str] = &[
    "queue",
    "pipeline_events",
    "check_runs",
    "session_events",
    "schema_version",
];

/// Apply all pending migrations.
pub(crate) fn migrate(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        );",
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    for (version, sql) in MIGRATIONS {
        if *version <= current {
            continue;
        }
        tracing::debug!(version, "applying migration");
        conn.execute_batch("BEGIN")?;
        let applied = conn.execute_batch(sql).and_then(|()| {
            conn.execute(
                "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, chrono::Utc::now().timestamp_millis()],
            )
            .map(|_| ())
        });
        match applied {
            Ok(()) => conn.execute_batch("COMMIT")?,
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                return Err(e.into());
            }
        }
    }
    Ok(())
}
