// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for configuration loading

use thiserror::Error;

/// Errors from loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("pipeline has no stages")]
    NoStages,
    #[error("duplicate stage id: {0}")]
    DuplicateStage(String),
    #[error("unknown stage id: {0}")]
    UnknownStage(String),
    #[error("stage {stage} references unknown check: {check}")]
    UnknownCheck { stage: String, check: String },
    #[error("stage {stage} routes on_fail to unknown stage: {target}")]
    UnknownOnFailTarget { stage: String, target: String },
    #[error("invalid duration {0:?}: {1}")]
    InvalidDuration(String, String),
    #[error("triage has no stages")]
    NoTriageStages,
    #[error("triage stage {stage} routes outcome {outcome:?} to unknown stage: {target}")]
    UnknownOutcomeTarget {
        stage: String,
        outcome: String,
        target: String,
    },
}
