// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed triage state store.
//!
//! Layout under the (namespace-scoped) base directory:
//!
//! ```text
//! {base}/{issue}.json                    — triage state document
//! {base}/{issue}/{stage}.outcome.json    — per-stage outcome files
//! {base}/.advance.lock                   — advisory lock for Advance()
//! ```

use crate::{write_json, StateError};
use chrono::Utc;
use factory_core::{TriageOutcome, TriageState, TriageStatus};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Lock files older than this are considered stale and removed.
pub const ADVANCE_LOCK_STALE_AFTER: Duration = Duration::from_secs(30 * 60);

/// Store of per-issue triage state documents.
pub struct TriageStore {
    base: PathBuf,
}

/// Guard for the `.advance.lock` file; removes it on drop.
pub struct AdvanceLock {
    path: PathBuf,
}

impl Drop for AdvanceLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

impl TriageStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    fn state_path(&self, issue: u64) -> PathBuf {
        self.base.join(format!("{issue}.json"))
    }

    /// Path for a stage's outcome file.
    pub fn outcome_path(&self, issue: u64, stage: &str) -> PathBuf {
        self.base
            .join(issue.to_string())
            .join(format!("{stage}.outcome.json"))
    }

    /// Persist a state document (create or replace).
    pub fn put(&self, state: &TriageState) -> Result<(), StateError> {
        write_json(&self.state_path(state.issue), state)?;
        Ok(())
    }

    /// Load the state document for an issue.
    pub fn get(&self, issue: u64) -> Result<TriageState, StateError> {
        let data = std::fs::read(self.state_path(issue)).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StateError::NotFound(issue)
            } else {
                StateError::Io(e)
            }
        })?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Read-modify-write a state document, bumping `updated_at`.
    pub fn update<F>(&self, issue: u64, mutate: F) -> Result<TriageState, StateError>
    where
        F: FnOnce(&mut TriageState),
    {
        let mut state = self.get(issue)?;
        mutate(&mut state);
        state.updated_at = Utc::now();
        self.put(&state)?;
        Ok(state)
    }

    /// All triage states in issue order.
    pub fn list(&self) -> Result<Vec<TriageState>, StateError> {
        let mut issues = Vec::new();
        let entries = match std::fs::read_dir(&self.base) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(issue) = name
                .strip_suffix(".json")
                .and_then(|stem| stem.parse::<u64>().ok())
            {
                issues.push(issue);
            }
        }
        issues.sort_unstable();
        issues.into_iter().map(|issue| self.get(issue)).collect()
    }

    /// First pending triage by issue number, if any.
    pub fn first_pending(&self) -> Result<Option<TriageState>, StateError> {
        Ok(self
            .list()?
            .into_iter()
            .find(|s| s.status == TriageStatus::Pending))
    }

    /// The triage currently in progress, if any.
    pub fn in_progress(&self) -> Result<Option<TriageState>, StateError> {
        Ok(self
            .list()?
            .into_iter()
            .find(|s| s.status == TriageStatus::InProgress))
    }

    /// Write a stage outcome file (audit trail for print stages, consumed
    /// output for async stages).
    pub fn write_outcome(
        &self,
        issue: u64,
        stage: &str,
        outcome: &TriageOutcome,
    ) -> Result<(), StateError> {
        write_json(&self.outcome_path(issue, stage), outcome)?;
        Ok(())
    }

    /// Load a stage outcome file, if the agent has written it yet.
    pub fn read_outcome(
        &self,
        issue: u64,
        stage: &str,
    ) -> Result<Option<TriageOutcome>, StateError> {
        match std::fs::read(self.outcome_path(issue, stage)) {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Try to take the advance lock.
    ///
    /// Returns `None` when another process holds it. A lock file older than
    /// [`ADVANCE_LOCK_STALE_AFTER`] is removed and acquisition retried once.
    pub fn try_advance_lock(&self) -> Result<Option<AdvanceLock>, StateError> {
        std::fs::create_dir_all(&self.base)?;
        let path = self.base.join(".advance.lock");

        for _ in 0..2 {
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(_) => return Ok(Some(AdvanceLock { path })),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    let stale = std::fs::metadata(&path)
                        .and_then(|m| m.modified())
                        .ok()
                        .and_then(|modified| modified.elapsed().ok())
                        .map(|age| age > ADVANCE_LOCK_STALE_AFTER)
                        .unwrap_or(false);
                    if !stale {
                        return Ok(None);
                    }
                    tracing::warn!(path = %path.display(), "removing stale advance lock");
                    let _ = std::fs::remove_file(&path);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
#[path = "triage_store_tests.rs"]
mod tests;
