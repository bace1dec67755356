// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle events and session naming.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Window before an `active` event within which a `factory_send` attributes
/// the activity to the orchestrator rather than a human (inclusive).
pub const FACTORY_SEND_ATTRIBUTION_MS: i64 = 5_000;

/// Kind of session lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventKind {
    /// Session created by the orchestrator
    Started,
    /// Agent started processing a prompt
    Active,
    /// Agent finished and is waiting for input
    Idle,
    /// Agent process exited
    Exited,
    /// Orchestrator sent input to the session
    FactorySend,
    /// Orchestrator nudged a long-running session
    Steer,
    /// A human typed into the session
    HumanInput,
}

impl SessionEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionEventKind::Started => "started",
            SessionEventKind::Active => "active",
            SessionEventKind::Idle => "idle",
            SessionEventKind::Exited => "exited",
            SessionEventKind::FactorySend => "factory_send",
            SessionEventKind::Steer => "steer",
            SessionEventKind::HumanInput => "human_input",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "started" => Some(SessionEventKind::Started),
            "active" => Some(SessionEventKind::Active),
            "idle" => Some(SessionEventKind::Idle),
            "exited" => Some(SessionEventKind::Exited),
            "factory_send" => Some(SessionEventKind::FactorySend),
            "steer" => Some(SessionEventKind::Steer),
            "human_input" => Some(SessionEventKind::HumanInput),
            _ => None,
        }
    }

    /// States in which the agent is considered busy (timeout measured from
    /// the session's `started` event, not from the latest of these).
    pub fn is_active_equivalent(&self) -> bool {
        matches!(
            self,
            SessionEventKind::Started
                | SessionEventKind::Active
                | SessionEventKind::Steer
                | SessionEventKind::FactorySend
        )
    }
}

impl fmt::Display for SessionEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One appended session lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub session_id: String,
    pub issue: u64,
    pub stage: String,
    pub event: SessionEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

/// Errors from session name validation
#[derive(Debug, Error)]
pub enum SessionNameError {
    #[error("session name is empty")]
    Empty,
    #[error("session name must start with an alphanumeric character: {0}")]
    BadFirstChar(String),
    #[error("session name contains invalid character {1:?}: {0}")]
    BadChar(String, char),
}

/// Validate a multiplexer session name: non-empty, first character
/// alphanumeric, the rest `[A-Za-z0-9_.-]`.
pub fn validate_session_name(name: &str) -> Result<(), SessionNameError> {
    let mut chars = name.chars();
    let first = chars.next().ok_or(SessionNameError::Empty)?;
    if !first.is_ascii_alphanumeric() {
        return Err(SessionNameError::BadFirstChar(name.to_string()));
    }
    for c in chars {
        if !(c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-') {
            return Err(SessionNameError::BadChar(name.to_string(), c));
        }
    }
    Ok(())
}

/// Session name for a dev-pipeline stage.
pub fn session_name(issue: u64, stage: &str) -> String {
    format!("{issue}-{stage}")
}

/// Session name for a triage stage.
pub fn triage_session_name(issue: u64, stage: &str) -> String {
    format!("triage-{issue}-{stage}")
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
