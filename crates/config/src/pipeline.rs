// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline configuration
//!
//! Loaded from a per-repo YAML file with a top-level `pipeline:` key.

use crate::{parse_duration, ConfigError};
use indexmap::IndexMap;
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Default number of check+fix iterations within one stage attempt.
pub const DEFAULT_MAX_FIX_ROUNDS: u32 = 2;

/// Stage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageType {
    /// Runs the coding agent in a multiplexer session
    Agent,
    /// Runs the check set without a session
    ChecksOnly,
    /// Rebase + push + PR + merge, run by the orchestrator
    Merge,
}

/// Merge strategy for merge stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    #[default]
    Squash,
    Merge,
    Rebase,
}

impl MergeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::Squash => "squash",
            MergeStrategy::Merge => "merge",
            MergeStrategy::Rebase => "rebase",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure routing for a stage.
///
/// Accepts either:
///   `on_fail: "implement"`          — route to a named stage
///   `on_fail: "escalate"`           — block for a human
///   `on_fail: { default: "impl" }`  — map form, same as the named string
/// Missing means retry the same stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum OnFail {
    /// Retry the same stage (bounded by the attempt ceiling)
    #[default]
    SameStage,
    /// Set the pipeline to blocked and wait for a human
    Escalate,
    /// Route to another stage, resetting the attempt counter
    Named(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OnFailRaw {
    Bare(String),
    Map { default: String },
}

impl<'de> Deserialize<'de> for OnFail {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = OnFailRaw::deserialize(d)?;
        let target = match raw {
            OnFailRaw::Bare(s) => s,
            OnFailRaw::Map { default } => default,
        };
        Ok(match target.as_str() {
            "" => OnFail::SameStage,
            "escalate" => OnFail::Escalate,
            _ => OnFail::Named(target),
        })
    }
}

/// One named check command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckDef {
    pub command: String,
    /// Output parser name; `generic` treats exit 0 as pass
    #[serde(default = "default_parser")]
    pub parser: String,
    /// Duration string, e.g. "90s"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(default)]
    pub auto_fix: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_command: Option<String>,
}

fn default_parser() -> String {
    "generic".to_string()
}

impl CheckDef {
    /// Per-check timeout, falling back to the given default.
    pub fn timeout_or(&self, fallback: Duration) -> Duration {
        self.timeout
            .as_deref()
            .and_then(|s| parse_duration(s).ok())
            .unwrap_or(fallback)
    }
}

/// One stage in the linear stage list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDef {
    pub id: String,
    #[serde(rename = "type")]
    pub stage_type: StageType,
    /// Path to the prompt template, relative to the config file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
    /// Check names for checks_only stages
    #[serde(default)]
    pub checks: Vec<String>,
    /// Check names run after the agent goes idle (agent stages)
    #[serde(default)]
    pub checks_after: Vec<String>,
    /// Success of this stage is a precondition for pipeline completion
    #[serde(default)]
    pub goal_gate: bool,
    #[serde(default)]
    pub on_fail: OnFail,
    #[serde(default)]
    pub merge_strategy: MergeStrategy,
    /// Duration string overriding the default stage timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl StageDef {
    /// The check names this stage runs, regardless of stage type.
    pub fn check_names(&self) -> &[String] {
        match self.stage_type {
            StageType::ChecksOnly => &self.checks,
            _ => &self.checks_after,
        }
    }
}

/// Defaults applied to all stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    /// Extra flags passed to the agent command
    #[serde(default)]
    pub flags: Vec<String>,
    /// Default stage timeout as a duration string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

/// Top-level pipeline configuration for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub repo: String,
    #[serde(default = "default_max_fix_rounds")]
    pub max_fix_rounds: u32,
    /// Discard the session after this many attempts (unused stages recycle)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fresh_session_after: Option<u32>,
    #[serde(default)]
    pub defaults: Defaults,
    /// Shell commands run in the fresh worktree at creation time
    #[serde(default)]
    pub setup: Vec<String>,
    #[serde(default)]
    pub checks: IndexMap<String, CheckDef>,
    pub stages: Vec<StageDef>,
}

fn default_max_fix_rounds() -> u32 {
    DEFAULT_MAX_FIX_ROUNDS
}

/// Wrapper matching the file layout (`pipeline:` top-level key).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    pipeline: PipelineConfig,
}

impl PipelineConfig {
    /// Load and validate a pipeline config from a YAML file.
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
        let config = file.pipeline;
        config.validate()?;
        Ok(config)
    }

    /// Validate stage ids, check references, and on_fail targets.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stages.is_empty() {
            return Err(ConfigError::NoStages);
        }

        let mut seen = HashSet::new();
        for stage in &self.stages {
            if !seen.insert(stage.id.as_str()) {
                return Err(ConfigError::DuplicateStage(stage.id.clone()));
            }
        }

        for stage in &self.stages {
            for check in stage.check_names() {
                if !self.checks.contains_key(check) {
                    return Err(ConfigError::UnknownCheck {
                        stage: stage.id.clone(),
                        check: check.clone(),
                    });
                }
            }
            if let OnFail::Named(target) = &stage.on_fail {
                if !seen.contains(target.as_str()) {
                    return Err(ConfigError::UnknownOnFailTarget {
                        stage: stage.id.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Look up a stage by id.
    pub fn stage(&self, id: &str) -> Option<&StageDef> {
        self.stages.iter().find(|s| s.id == id)
    }

    /// The configured stage following `id`, if any.
    pub fn next_stage(&self, id: &str) -> Option<&StageDef> {
        let idx = self.stages.iter().position(|s| s.id == id)?;
        self.stages.get(idx + 1)
    }

    /// First stage of the pipeline.
    pub fn first_stage(&self) -> Option<&StageDef> {
        self.stages.first()
    }

    /// Ids of all stages marked as goal gates.
    pub fn goal_gate_stages(&self) -> Vec<&str> {
        self.stages
            .iter()
            .filter(|s| s.goal_gate)
            .map(|s| s.id.as_str())
            .collect()
    }

    /// Resolve the check definitions for a stage, in declaration order.
    pub fn stage_checks(&self, stage: &StageDef) -> Vec<(String, CheckDef)> {
        stage
            .check_names()
            .iter()
            .filter_map(|name| {
                self.checks
                    .get(name)
                    .map(|def| (name.clone(), def.clone()))
            })
            .collect()
    }

    /// Effective timeout for a stage: stage override, else defaults, else
    /// the caller's fallback.
    pub fn stage_timeout(&self, stage: &StageDef, fallback: Duration) -> Duration {
        stage
            .timeout
            .as_deref()
            .or(self.defaults.timeout.as_deref())
            .and_then(|s| parse_duration(s).ok())
            .unwrap_or(fallback)
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
