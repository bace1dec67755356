// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Check execution records and gate results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Final state of a check within a stage attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    Pass,
    Fail,
    /// Not reached because an earlier check failed with stop-on-first-fail
    Skipped,
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckState::Pass => "pass",
            CheckState::Fail => "fail",
            CheckState::Skipped => "skipped",
        };
        write!(f, "{s}")
    }
}

/// One executed check within a gate run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRecord {
    pub name: String,
    pub passed: bool,
    pub auto_fixed: bool,
    /// 1 normally, 2 when the autofix retry ran
    pub runs: u32,
    pub exit_code: i32,
    pub duration_ms: u64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub findings: String,
}

/// Summary of a failure still present after a gate run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemainingFailure {
    pub summary: String,
    pub findings: String,
}

/// Structured result of running a stage's check set once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateResult {
    /// Stage id the gate belongs to
    pub gate: String,
    pub issue: u64,
    pub fix_round: u32,
    pub passed: bool,
    /// Every attempted check, exactly once, in input order
    pub checks: Vec<CheckRecord>,
    /// Check name → failure detail for checks that ended failed
    pub remaining_failures: BTreeMap<String, RemainingFailure>,
}

impl GateResult {
    /// A gate with no checks passes vacuously.
    pub fn empty(gate: impl Into<String>, issue: u64, fix_round: u32) -> Self {
        Self {
            gate: gate.into(),
            issue,
            fix_round,
            passed: true,
            checks: Vec::new(),
            remaining_failures: BTreeMap::new(),
        }
    }
}

/// A persisted check-run row in the event store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRun {
    pub issue: u64,
    pub stage: String,
    pub attempt: u32,
    pub fix_round: u32,
    pub check_name: String,
    pub passed: bool,
    pub auto_fixed: bool,
    pub exit_code: i32,
    pub duration_ms: u64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub findings: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
#[path = "check_tests.rs"]
mod tests;
