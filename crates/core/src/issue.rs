// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Issue metadata fetched from the hosting service.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from issue validation
#[derive(Debug, Error)]
pub enum IssueError {
    #[error("invalid issue number: {0} (must be > 0)")]
    InvalidNumber(i64),
}

/// Validate that an issue number is usable as a pipeline key.
pub fn validate_issue(number: i64) -> Result<u64, IssueError> {
    if number <= 0 {
        return Err(IssueError::InvalidNumber(number));
    }
    Ok(number as u64)
}

/// An issue document as fetched from the hosting service.
///
/// Cached on disk at pipeline creation so prompt rendering does not re-hit
/// the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone: Option<String>,
    /// Checklist items parsed from the body (`- [ ]` / `- [x]` lines)
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
}

impl Issue {
    pub fn new(number: u64, title: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        let acceptance_criteria = parse_acceptance_criteria(&body);
        Self {
            number,
            title: title.into(),
            body,
            state: String::new(),
            labels: Vec::new(),
            milestone: None,
            acceptance_criteria,
        }
    }
}

/// Extract acceptance criteria from markdown checklist lines in an issue body.
pub fn parse_acceptance_criteria(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| {
            let trimmed = line.trim_start();
            trimmed
                .strip_prefix("- [ ] ")
                .or_else(|| trimmed.strip_prefix("- [x] "))
                .or_else(|| trimmed.strip_prefix("- [X] "))
                .map(|rest| rest.trim().to_string())
        })
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
#[path = "issue_tests.rs"]
mod tests;
