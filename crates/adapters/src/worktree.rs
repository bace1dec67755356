// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git worktree management.
//!
//! Each pipeline owns one isolated worktree checked out from `origin/main`
//! on its feature branch. Removal tolerates an already-removed tree so
//! cleanup stays idempotent.

use crate::subprocess::{run_with_timeout, GIT_WORKTREE_TIMEOUT};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

/// Errors from worktree operations
#[derive(Debug, Error)]
pub enum WorktreeError {
    #[error("worktree create failed: {0}")]
    CreateFailed(String),
    #[error("worktree remove failed: {0}")]
    RemoveFailed(String),
}

/// Adapter producing isolated working directories with their own branch.
#[async_trait]
pub trait WorktreeAdapter: Clone + Send + Sync + 'static {
    /// Create a worktree for `branch` off origin/main, returning its path.
    async fn create(&self, issue: u64, branch: &str) -> Result<PathBuf, WorktreeError>;

    /// Remove a worktree. Succeeds if it is already gone.
    async fn remove(&self, path: &Path) -> Result<(), WorktreeError>;
}

/// Production adapter shelling out to `git worktree`.
#[derive(Clone)]
pub struct GitWorktreeAdapter {
    repo_dir: PathBuf,
    worktrees_dir: PathBuf,
}

impl GitWorktreeAdapter {
    pub fn new(repo_dir: impl Into<PathBuf>, worktrees_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            worktrees_dir: worktrees_dir.into(),
        }
    }
}

async fn git(
    dir: &Path,
    args: &[&str],
    description: &str,
) -> Result<std::process::Output, String> {
    let mut cmd = Command::new("git");
    cmd.current_dir(dir).args(args);
    run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT, description).await
}

#[async_trait]
impl WorktreeAdapter for GitWorktreeAdapter {
    async fn create(&self, issue: u64, branch: &str) -> Result<PathBuf, WorktreeError> {
        let path = self.worktrees_dir.join(issue.to_string());

        let fetch = git(&self.repo_dir, &["fetch", "origin", "main"], "git fetch")
            .await
            .map_err(WorktreeError::CreateFailed)?;
        if !fetch.status.success() {
            return Err(WorktreeError::CreateFailed(
                String::from_utf8_lossy(&fetch.stderr).trim().to_string(),
            ));
        }

        let path_str = path.display().to_string();
        let output = git(
            &self.repo_dir,
            &[
                "worktree",
                "add",
                "-b",
                branch,
                &path_str,
                "origin/main",
            ],
            "git worktree add",
        )
        .await
        .map_err(WorktreeError::CreateFailed)?;

        if !output.status.success() {
            return Err(WorktreeError::CreateFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(path)
    }

    async fn remove(&self, path: &Path) -> Result<(), WorktreeError> {
        if !path.exists() {
            return Ok(());
        }

        let path_str = path.display().to_string();
        let output = git(
            &self.repo_dir,
            &["worktree", "remove", "--force", &path_str],
            "git worktree remove",
        )
        .await
        .map_err(WorktreeError::RemoveFailed)?;

        if !output.status.success() {
            // Fall back to removing the directory; a later `git worktree
            // prune` reclaims the registration.
            tracing::warn!(
                path = %path.display(),
                stderr = %String::from_utf8_lossy(&output.stderr),
                "git worktree remove failed, removing directory"
            );
            tokio::fs::remove_dir_all(path)
                .await
                .map_err(|e| WorktreeError::RemoveFailed(e.to_string()))?;
        }
        Ok(())
    }
}

/// In-memory worktree adapter for tests: creates plain directories.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone)]
pub struct FakeWorktreeAdapter {
    base: PathBuf,
    created: std::sync::Arc<parking_lot::Mutex<Vec<(u64, String)>>>,
    removed: std::sync::Arc<parking_lot::Mutex<Vec<PathBuf>>>,
    fail_create: std::sync::Arc<parking_lot::Mutex<bool>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeWorktreeAdapter {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            created: std::sync::Arc::default(),
            removed: std::sync::Arc::default(),
            fail_create: std::sync::Arc::default(),
        }
    }

    pub fn created(&self) -> Vec<(u64, String)> {
        self.created.lock().clone()
    }

    pub fn removed(&self) -> Vec<PathBuf> {
        self.removed.lock().clone()
    }

    pub fn set_fail_create(&self, fail: bool) {
        *self.fail_create.lock() = fail;
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl WorktreeAdapter for FakeWorktreeAdapter {
    async fn create(&self, issue: u64, branch: &str) -> Result<PathBuf, WorktreeError> {
        if *self.fail_create.lock() {
            return Err(WorktreeError::CreateFailed("fake create failure".into()));
        }
        let path = self.base.join(issue.to_string());
        std::fs::create_dir_all(&path)
            .map_err(|e| WorktreeError::CreateFailed(e.to_string()))?;
        self.created.lock().push((issue, branch.to_string()));
        Ok(path)
    }

    async fn remove(&self, path: &Path) -> Result<(), WorktreeError> {
        if path.exists() {
            std::fs::remove_dir_all(path)
                .map_err(|e| WorktreeError::RemoveFailed(e.to_string()))?;
        }
        self.removed.lock().push(path.to_path_buf());
        Ok(())
    }
}

#[cfg(test)]
#[path = "worktree_tests.rs"]
mod tests;
