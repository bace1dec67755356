// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Actions reported by the orchestrator tick.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the tick did for one pipeline (or the queue/triage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickActionKind {
    /// Nothing to do (busy, blocked, human typing, guard)
    Skip,
    /// Sent a wrap-up nudge to a long-running session
    Steer,
    /// Moved the pipeline to its next stage
    Advanced,
    /// Re-attempted the current stage
    Retry,
    /// Routed to another stage via on_fail
    Routed,
    /// Escalated to a human (status blocked)
    Escalate,
    /// Pipeline reached completed
    Completed,
    /// Pipeline reached failed
    Failed,
    /// Popped an issue off the queue and created its pipeline
    QueueStarted,
    /// Pipeline was rate limited; will retry on a later tick
    RateLimited,
}

impl fmt::Display for TickActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TickActionKind::Skip => "skip",
            TickActionKind::Steer => "steer",
            TickActionKind::Advanced => "advanced",
            TickActionKind::Retry => "retry",
            TickActionKind::Routed => "routed",
            TickActionKind::Escalate => "escalate",
            TickActionKind::Completed => "completed",
            TickActionKind::Failed => "failed",
            TickActionKind::QueueStarted => "queue_started",
            TickActionKind::RateLimited => "rate_limited",
        };
        write!(f, "{s}")
    }
}

/// One action taken during a `CheckIn` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<u64>,
    pub action: TickActionKind,
    #[serde(default)]
    pub detail: String,
}

impl TickAction {
    pub fn new(issue: impl Into<Option<u64>>, action: TickActionKind, detail: impl Into<String>) -> Self {
        Self {
            issue: issue.into(),
            action,
            detail: detail.into(),
        }
    }

    /// Prefix the detail for triage-originated actions.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.detail = format!("{prefix}{}", self.detail);
        self
    }
}

impl fmt::Display for TickAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.issue {
            Some(issue) => write!(f, "#{issue} {}", self.action)?,
            None => write!(f, "{}", self.action)?,
        }
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}
