// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coding-agent print mode.
//!
//! Triage print stages and feature-intent derivation run the agent as a
//! one-shot subprocess (`--print`) instead of a long-lived session.

use crate::subprocess::{run_with_timeout, PRINT_COMMAND_TIMEOUT};
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tokio::process::Command;

/// Errors from agent subprocess invocations
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent command failed: {0}")]
    CommandFailed(String),
    #[error("agent exited with status {status}: {stderr}")]
    NonZeroExit { status: i32, stderr: String },
}

/// Runs the coding agent in one-shot print mode.
#[async_trait]
pub trait PrintRunner: Clone + Send + Sync + 'static {
    /// Run a prompt to completion and return stdout.
    async fn run_print(&self, prompt: &str, cwd: &Path) -> Result<String, AgentError>;
}

/// Production runner invoking the `claude` CLI with `--print`.
#[derive(Clone)]
pub struct ClaudePrintRunner {
    command: String,
}

impl ClaudePrintRunner {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Default for ClaudePrintRunner {
    fn default() -> Self {
        Self::new("claude")
    }
}

#[async_trait]
impl PrintRunner for ClaudePrintRunner {
    async fn run_print(&self, prompt: &str, cwd: &Path) -> Result<String, AgentError> {
        let mut cmd = Command::new(&self.command);
        cmd.arg("--print").arg(prompt).current_dir(cwd);

        let output = run_with_timeout(cmd, PRINT_COMMAND_TIMEOUT, "agent --print")
            .await
            .map_err(AgentError::CommandFailed)?;

        if !output.status.success() {
            return Err(AgentError::NonZeroExit {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Scripted print runner for tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Default)]
pub struct FakePrintRunner {
    responses: std::sync::Arc<parking_lot::Mutex<std::collections::VecDeque<String>>>,
    prompts: std::sync::Arc<parking_lot::Mutex<Vec<String>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakePrintRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next response returned by `run_print`.
    pub fn push_response(&self, response: impl Into<String>) {
        self.responses.lock().push_back(response.into());
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl PrintRunner for FakePrintRunner {
    async fn run_print(&self, prompt: &str, _cwd: &Path) -> Result<String, AgentError> {
        self.prompts.lock().push(prompt.to_string());
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| AgentError::CommandFailed("no scripted response".to_string()))
    }
}
