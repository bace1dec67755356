// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed pipeline state store.
//!
//! One directory per issue under the base directory:
//!
//! ```text
//! {base}/{issue}/pipeline.json      — the state document
//! {base}/{issue}/issue.json         — cached issue metadata
//! {base}/{issue}/checkpoints/       — human-readable stage breadcrumbs
//! ```

use crate::{write_json, StateError};
use factory_core::{Issue, PipelineState, PipelineStatus};
use std::path::{Path, PathBuf};

/// Store of per-issue pipeline state documents.
pub struct PipelineStore {
    base: PathBuf,
}

impl PipelineStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    /// Directory holding everything for one issue.
    pub fn issue_dir(&self, issue: u64) -> PathBuf {
        self.base.join(issue.to_string())
    }

    fn state_path(&self, issue: u64) -> PathBuf {
        self.issue_dir(issue).join("pipeline.json")
    }

    fn issue_cache_path(&self, issue: u64) -> PathBuf {
        self.issue_dir(issue).join("issue.json")
    }

    /// Directory for checkpoint breadcrumb files.
    pub fn checkpoint_dir(&self, issue: u64) -> PathBuf {
        self.issue_dir(issue).join("checkpoints")
    }

    /// Persist a brand-new state document. Fails if one already exists.
    pub fn create(&self, state: &PipelineState) -> Result<(), StateError> {
        let path = self.state_path(state.issue);
        if path.exists() {
            return Err(StateError::AlreadyExists(state.issue));
        }
        std::fs::create_dir_all(self.issue_dir(state.issue))?;
        write_json(&path, state)?;
        Ok(())
    }

    /// Load the state document for an issue.
    pub fn get(&self, issue: u64) -> Result<PipelineState, StateError> {
        let path = self.state_path(issue);
        let data = std::fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StateError::NotFound(issue)
            } else {
                StateError::Io(e)
            }
        })?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Read-modify-write the state document.
    pub fn update<F>(&self, issue: u64, mutate: F) -> Result<PipelineState, StateError>
    where
        F: FnOnce(&mut PipelineState),
    {
        let mut state = self.get(issue)?;
        mutate(&mut state);
        write_json(&self.state_path(issue), &state)?;
        Ok(state)
    }

    /// Replace the state document wholesale.
    pub fn put(&self, state: &PipelineState) -> Result<(), StateError> {
        write_json(&self.state_path(state.issue), state)?;
        Ok(())
    }

    /// All pipelines, optionally filtered by status, in directory order.
    pub fn list(&self, status: Option<PipelineStatus>) -> Result<Vec<PipelineState>, StateError> {
        let mut states = Vec::new();
        let entries = match std::fs::read_dir(&self.base) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(states),
            Err(e) => return Err(e.into()),
        };
        let mut issues: Vec<u64> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_string_lossy().parse::<u64>().ok())
            .collect();
        issues.sort_unstable();

        for issue in issues {
            match self.get(issue) {
                Ok(state) => {
                    if status.map_or(true, |s| state.status == s) {
                        states.push(state);
                    }
                }
                // Directory without a state document (partially cleaned up)
                Err(StateError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(states)
    }

    /// Delete the whole per-issue directory.
    pub fn delete(&self, issue: u64) -> Result<(), StateError> {
        let dir = self.issue_dir(issue);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StateError::NotFound(issue)),
            Err(e) => Err(e.into()),
        }
    }

    /// Cache the fetched issue document alongside the state.
    pub fn cache_issue(&self, issue: &Issue) -> Result<(), StateError> {
        write_json(&self.issue_cache_path(issue.number), issue)?;
        Ok(())
    }

    /// Load the cached issue document, if present.
    pub fn cached_issue(&self, issue: u64) -> Result<Option<Issue>, StateError> {
        let path = self.issue_cache_path(issue);
        match std::fs::read(&path) {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a human-readable checkpoint breadcrumb for a stage attempt.
    pub fn write_checkpoint(
        &self,
        issue: u64,
        stage: &str,
        attempt: u32,
        contents: &str,
    ) -> Result<(), StateError> {
        let dir = self.checkpoint_dir(issue);
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join(format!("{stage}.{attempt}.md")), contents)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
