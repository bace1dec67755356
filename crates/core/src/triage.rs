// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Triage state machine records.
//!
//! Triage classifies an issue through its own linear stage list before the
//! issue may enter the dev queue. State documents live in a directory
//! separate from the pipeline store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a triage run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageStatus {
    Pending,
    InProgress,
    Completed,
}

impl fmt::Display for TriageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TriageStatus::Pending => "pending",
            TriageStatus::InProgress => "in_progress",
            TriageStatus::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// Record of one triage stage execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageStageRecord {
    pub stage: String,
    pub outcome: String,
    pub finished_at: DateTime<Utc>,
}

/// Per-issue triage state document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageState {
    pub issue: u64,
    #[serde(default)]
    pub repo: String,
    pub current_stage: String,
    pub status: TriageStatus,
    /// Multiplexer session name for async stages, empty otherwise
    #[serde(default)]
    pub current_session: String,
    #[serde(default)]
    pub stage_history: Vec<TriageStageRecord>,
    pub updated_at: DateTime<Utc>,
    /// Issue title/body snapshot used for prompt rendering
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// Contents of a `{stage}.outcome.json` file written by the agent (async
/// stages) or by the runner itself (print stages).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageOutcome {
    pub outcome: String,
    #[serde(default)]
    pub summary: String,
}
