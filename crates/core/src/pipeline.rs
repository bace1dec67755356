// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline state document and stage lifecycle records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Ceiling for automatic re-executions of the same stage. Manual `Retry`
/// bypasses it.
pub const MAX_ATTEMPTS: u32 = 3;

/// Status of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Waiting for the next tick to pick it up
    Pending,
    /// A stage is currently executing
    InProgress,
    /// Escalated; needs a human decision
    Blocked,
    /// Agent hit a provider rate limit; retried on a later tick
    RateLimited,
    /// All stages done, goal gates satisfied
    Completed,
    /// Out of attempts or explicitly failed
    Failed,
}

impl PipelineStatus {
    /// Terminal statuses are never re-entered by the tick.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStatus::Completed | PipelineStatus::Failed)
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStatus::Pending => "pending",
            PipelineStatus::InProgress => "in_progress",
            PipelineStatus::Blocked => "blocked",
            PipelineStatus::RateLimited => "rate_limited",
            PipelineStatus::Completed => "completed",
            PipelineStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Terminal outcome of one stage attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Success,
    Fail,
    RateLimited,
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageOutcome::Success => "success",
            StageOutcome::Fail => "fail",
            StageOutcome::RateLimited => "rate_limited",
        };
        write!(f, "{s}")
    }
}

/// Record of one stage attempt (for stage history)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageHistoryEntry {
    pub stage: String,
    pub attempt: u32,
    pub outcome: StageOutcome,
    /// Wall-clock duration of the attempt in milliseconds
    pub duration_ms: u64,
    pub fix_rounds: u32,
    /// Checks that passed on the first round without autofix
    pub checks_first_pass: u32,
}

/// Durable per-issue pipeline state.
///
/// One JSON document per issue under the pipelines base directory, mutated
/// only by the orchestrator tick and the single-shot operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub issue: u64,
    pub title: String,
    pub branch: String,
    pub worktree: PathBuf,
    /// Repo-specific config file for multi-repo setups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,
    pub repo_dir: PathBuf,
    #[serde(default)]
    pub namespace: String,
    pub status: PipelineStatus,
    pub current_stage: String,
    pub current_attempt: u32,
    pub current_fix_round: u32,
    /// Multiplexer session name, empty when no session is associated
    #[serde(default)]
    pub current_session: String,
    /// Stage id → "" (not yet) or "success"; seeded from config at creation
    #[serde(default)]
    pub goal_gates: BTreeMap<String, String>,
    #[serde(default)]
    pub stage_history: Vec<StageHistoryEntry>,
    /// User-facing description of what this pipeline delivers
    #[serde(default)]
    pub feature_intent: String,
    /// Variables populated during execution (e.g. dependent_issues)
    #[serde(default)]
    pub runtime_vars: BTreeMap<String, String>,
}

impl PipelineState {
    /// Create a fresh state positioned at the first stage.
    pub fn new(
        issue: u64,
        title: impl Into<String>,
        branch: impl Into<String>,
        worktree: PathBuf,
        repo_dir: PathBuf,
        first_stage: impl Into<String>,
    ) -> Self {
        Self {
            issue,
            title: title.into(),
            branch: branch.into(),
            worktree,
            config_path: None,
            repo_dir,
            namespace: String::new(),
            status: PipelineStatus::Pending,
            current_stage: first_stage.into(),
            current_attempt: 1,
            current_fix_round: 0,
            current_session: String::new(),
            goal_gates: BTreeMap::new(),
            stage_history: Vec::new(),
            feature_intent: String::new(),
            runtime_vars: BTreeMap::new(),
        }
    }

    /// Seed the goal-gate skeleton from the configured gate stages.
    pub fn with_goal_gates<I, S>(mut self, stages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for stage in stages {
            self.goal_gates.insert(stage.into(), String::new());
        }
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Mark a goal-gate stage as satisfied.
    pub fn satisfy_goal_gate(&mut self, stage: &str) {
        self.goal_gates
            .insert(stage.to_string(), "success".to_string());
    }

    /// First goal-gate stage that has not reached success, if any.
    pub fn unsatisfied_goal_gate(&self) -> Option<&str> {
        self.goal_gates
            .iter()
            .find(|(_, v)| v.as_str() != "success")
            .map(|(k, _)| k.as_str())
    }

    /// Reset per-stage counters when moving to a new stage.
    pub fn enter_stage(&mut self, stage: &str) {
        self.current_stage = stage.to_string();
        self.current_attempt = 1;
        self.current_fix_round = 0;
        self.current_session.clear();
        self.status = PipelineStatus::Pending;
    }

    /// Record a finished stage attempt.
    pub fn push_history(&mut self, entry: StageHistoryEntry) {
        self.stage_history.push(entry);
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
