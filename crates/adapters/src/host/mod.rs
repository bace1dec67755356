// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Code-hosting service adapters

mod github;

pub use github::GhHostAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeHostAdapter;

use async_trait::async_trait;
use factory_core::Issue;
use std::path::Path;
use thiserror::Error;

/// Merge strategies the hosting service accepts.
pub const MERGE_STRATEGIES: &[&str] = &["squash", "merge", "rebase"];

/// Errors from hosting-service operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("issue {0} not found")]
    IssueNotFound(u64),
    #[error("unrecognized merge strategy: {0}")]
    BadMergeStrategy(String),
    #[error("unsafe branch name: {0}")]
    UnsafeBranchName(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
    #[error("unexpected output: {0}")]
    BadOutput(String),
}

/// Options for creating a pull request.
#[derive(Debug, Clone, Default)]
pub struct PrOptions {
    pub branch: String,
    pub title: String,
    pub body: String,
    /// Target base branch; empty means the repo default
    pub base: String,
}

/// Adapter for the code-hosting service (issues, PRs, branch pushes).
#[async_trait]
pub trait HostAdapter: Clone + Send + Sync + 'static {
    /// Fetch an issue's metadata.
    async fn get_issue(&self, number: u64) -> Result<Issue, HostError>;

    /// Create a pull request for a branch.
    async fn create_pr(&self, dir: &Path, opts: &PrOptions) -> Result<(), HostError>;

    /// Find an open PR for a branch, returning its number.
    async fn find_pr_by_branch(&self, dir: &Path, branch: &str) -> Result<Option<u64>, HostError>;

    /// Merge the PR for a branch with the given strategy.
    async fn merge_pr(&self, dir: &Path, branch: &str, strategy: &str) -> Result<(), HostError>;

    /// Push a branch to the origin remote.
    async fn push_branch(&self, dir: &Path, branch: &str) -> Result<(), HostError>;

    /// Force-push a branch (with lease). Rejects names starting with `-`.
    async fn force_push_branch(&self, dir: &Path, branch: &str) -> Result<(), HostError>;

    /// Rebase the checkout in `dir` onto origin's main branch.
    ///
    /// Returns `conflicted=true` (with the rebase aborted) when the rebase
    /// hit conflicts; other failures are errors.
    async fn rebase_onto_main(&self, dir: &Path) -> Result<bool, HostError>;

    /// Apply a label to an issue (used by triage).
    async fn add_label(&self, number: u64, label: &str) -> Result<(), HostError>;
}

/// Validate a merge strategy against the accepted set.
pub fn validate_merge_strategy(strategy: &str) -> Result<(), HostError> {
    if MERGE_STRATEGIES.contains(&strategy) {
        Ok(())
    } else {
        Err(HostError::BadMergeStrategy(strategy.to_string()))
    }
}

/// Reject branch names that could be parsed as command-line flags.
pub fn validate_branch_name(branch: &str) -> Result<(), HostError> {
    if branch.is_empty() || branch.starts_with('-') {
        return Err(HostError::UnsafeBranchName(branch.to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
