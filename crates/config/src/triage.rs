// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Triage configuration
//!
//! Analogous to the pipeline config: a linear stage list, but stages have an
//! execution mode and outcome-based routing instead of on_fail.

use crate::ConfigError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a triage stage executes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageMode {
    /// Multiplexer session + outcome file, polled by the tick
    #[default]
    Async,
    /// Single-shot `--print` subprocess, completes within the tick
    Print,
}

/// One triage stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageStageDef {
    pub id: String,
    #[serde(default)]
    pub mode: TriageMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
    /// Label applied to the issue when the outcome is "yes" (print mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Outcome label → next stage id, or "done" to finish triage.
    /// An outcome missing from the map also finishes triage.
    #[serde(default)]
    pub outcomes: IndexMap<String, String>,
}

impl TriageStageDef {
    /// Route an outcome label to the next stage, or `None` when triage is
    /// finished ("done" or unmapped).
    pub fn route(&self, outcome: &str) -> Option<&str> {
        match self.outcomes.get(outcome).map(String::as_str) {
            Some("done") | None => None,
            Some(next) => Some(next),
        }
    }
}

/// Triage configuration for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageConfig {
    #[serde(default)]
    pub repo: String,
    pub stages: Vec<TriageStageDef>,
}

/// Wrapper matching the file layout (`triage:` top-level key).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    triage: TriageConfig,
}

impl TriageConfig {
    /// Load and validate a triage config from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file: ConfigFile =
            serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        let config = file.triage;
        config.validate()?;
        Ok(config)
    }

    /// Validate outcome routing targets.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stages.is_empty() {
            return Err(ConfigError::NoTriageStages);
        }
        for stage in &self.stages {
            for (outcome, target) in &stage.outcomes {
                if target != "done" && self.stage(target).is_none() {
                    return Err(ConfigError::UnknownOutcomeTarget {
                        stage: stage.id.clone(),
                        outcome: outcome.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn stage(&self, id: &str) -> Option<&TriageStageDef> {
        self.stages.iter().find(|s| s.id == id)
    }

    pub fn first_stage(&self) -> Option<&TriageStageDef> {
        self.stages.first()
    }
}

#[cfg(test)]
#[path = "triage_tests.rs"]
mod tests;
