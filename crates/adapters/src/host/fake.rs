// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory hosting adapter for tests.

use super::{
    validate_branch_name, validate_merge_strategy, HostAdapter, HostError, PrOptions,
};
use async_trait::async_trait;
use factory_core::Issue;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

#[derive(Default)]
struct Inner {
    issues: HashMap<u64, Issue>,
    /// branch → PR number
    prs: HashMap<String, u64>,
    next_pr: u64,
    merged: Vec<(String, String)>,
    pushed: Vec<String>,
    labels: HashMap<u64, HashSet<String>>,
    rebase_conflicts: bool,
    fail_rebase: bool,
}

/// Deterministic in-memory [`HostAdapter`].
#[derive(Clone, Default)]
pub struct FakeHostAdapter {
    inner: Arc<Mutex<Inner>>,
}

impl FakeHostAdapter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_pr: 100,
                ..Inner::default()
            })),
        }
    }

    pub fn add_issue(&self, issue: Issue) {
        self.inner.lock().issues.insert(issue.number, issue);
    }

    /// Make subsequent rebases report conflicts.
    pub fn set_rebase_conflicts(&self, conflicted: bool) {
        self.inner.lock().rebase_conflicts = conflicted;
    }

    /// Make subsequent rebases fail outright.
    pub fn set_rebase_failure(&self, fail: bool) {
        self.inner.lock().fail_rebase = fail;
    }

    /// Branches merged so far as (branch, strategy).
    pub fn merged(&self) -> Vec<(String, String)> {
        self.inner.lock().merged.clone()
    }

    /// Branches pushed (force or not) so far.
    pub fn pushed(&self) -> Vec<String> {
        self.inner.lock().pushed.clone()
    }

    /// Labels applied to an issue.
    pub fn labels(&self, issue: u64) -> Vec<String> {
        let inner = self.inner.lock();
        let mut labels: Vec<String> = inner
            .labels
            .get(&issue)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        labels.sort();
        labels
    }
}

#[async_trait]
impl HostAdapter for FakeHostAdapter {
    async fn get_issue(&self, number: u64) -> Result<Issue, HostError> {
        self.inner
            .lock()
            .issues
            .get(&number)
            .cloned()
            .ok_or(HostError::IssueNotFound(number))
    }

    async fn create_pr(&self, _dir: &Path, opts: &PrOptions) -> Result<(), HostError> {
        validate_branch_name(&opts.branch)?;
        let mut inner = self.inner.lock();
        let number = inner.next_pr;
        inner.next_pr += 1;
        inner.prs.insert(opts.branch.clone(), number);
        Ok(())
    }

    async fn find_pr_by_branch(&self, _dir: &Path, branch: &str) -> Result<Option<u64>, HostError> {
        validate_branch_name(branch)?;
        Ok(self.inner.lock().prs.get(branch).copied())
    }

    async fn merge_pr(&self, _dir: &Path, branch: &str, strategy: &str) -> Result<(), HostError> {
        validate_branch_name(branch)?;
        validate_merge_strategy(strategy)?;
        let mut inner = self.inner.lock();
        if !inner.prs.contains_key(branch) {
            return Err(HostError::CommandFailed(format!("no PR for {branch}")));
        }
        inner.merged.push((branch.to_string(), strategy.to_string()));
        Ok(())
    }

    async fn push_branch(&self, _dir: &Path, branch: &str) -> Result<(), HostError> {
        validate_branch_name(branch)?;
        self.inner.lock().pushed.push(branch.to_string());
        Ok(())
    }

    async fn force_push_branch(&self, _dir: &Path, branch: &str) -> Result<(), HostError> {
        validate_branch_name(branch)?;
        self.inner.lock().pushed.push(branch.to_string());
        Ok(())
    }

    async fn rebase_onto_main(&self, _dir: &Path) -> Result<bool, HostError> {
        let inner = self.inner.lock();
        if inner.fail_rebase {
            return Err(HostError::CommandFailed("git rebase: exploded".to_string()));
        }
        Ok(inner.rebase_conflicts)
    }

    async fn add_label(&self, number: u64, label: &str) -> Result<(), HostError> {
        self.inner
            .lock()
            .labels
            .entry(number)
            .or_default()
            .insert(label.to_string());
        Ok(())
    }
}
