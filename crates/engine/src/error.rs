// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine

use factory_adapters::{AgentError, HostError, SessionError, WorktreeError};
use factory_config::ConfigError;
use factory_core::{IssueError, SessionNameError};
use factory_storage::{StateError, StoreError};
use thiserror::Error;

/// Errors that can occur in the orchestration engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Issue(#[from] IssueError),
    #[error(transparent)]
    SessionName(#[from] SessionNameError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("event store error: {0}")]
    Store(#[from] StoreError),
    #[error("state store error: {0}")]
    State(#[from] StateError),
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error("hosting service error: {0}")]
    Host(#[from] HostError),
    #[error("worktree error: {0}")]
    Worktree(#[from] WorktreeError),
    #[error("agent error: {0}")]
    Agent(#[from] AgentError),
    #[error("unknown stage {stage} in pipeline for issue {issue}")]
    UnknownStage { issue: u64, stage: String },
    #[error("unknown triage stage {stage} for issue {issue}")]
    UnknownTriageStage { issue: u64, stage: String },
    #[error("pipeline for issue {0} is already completed")]
    AlreadyCompleted(u64),
    #[error("cleanup requires a terminal pipeline, issue {issue} is {status}")]
    NotTerminal { issue: u64, status: String },
    #[error("merge stage {0} runs in the orchestrator, not the stage engine")]
    MergeStage(String),
    #[error("setup command failed: {0}")]
    SetupFailed(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
