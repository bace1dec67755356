// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! factory-config: pipeline and triage configuration loading

mod duration;
mod error;
mod pipeline;
pub mod template;
mod triage;

pub use duration::parse_duration;
pub use error::ConfigError;
pub use pipeline::{
    CheckDef, Defaults, MergeStrategy, OnFail, PipelineConfig, StageDef, StageType,
};
pub use triage::{TriageConfig, TriageMode, TriageStageDef};
