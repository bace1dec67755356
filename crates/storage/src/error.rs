// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the stores

use thiserror::Error;

/// Errors from the SQLite event store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("issue {0} is already queued")]
    DuplicateQueued(u64),
    #[error("issue {0} is not queued")]
    NotQueued(u64),
}

/// Errors from the file-backed state stores
#[derive(Debug, Error)]
pub enum StateError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no pipeline state for issue {0}")]
    NotFound(u64),
    #[error("pipeline state for issue {0} already exists")]
    AlreadyExists(u64),
}
