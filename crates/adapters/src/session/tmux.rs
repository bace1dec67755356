// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux session adapter

use super::{SessionAdapter, SessionError};
use crate::subprocess::{run_with_timeout, TMUX_TIMEOUT};
use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Tmux-based session adapter
#[derive(Clone, Default)]
pub struct TmuxAdapter;

impl TmuxAdapter {
    pub fn new() -> Self {
        Self
    }
}

async fn tmux(args: &[&str], description: &str) -> Result<std::process::Output, SessionError> {
    let mut cmd = Command::new("tmux");
    cmd.args(args);
    run_with_timeout(cmd, TMUX_TIMEOUT, description)
        .await
        .map_err(SessionError::CommandFailed)
}

#[async_trait]
impl SessionAdapter for TmuxAdapter {
    async fn new_session(
        &self,
        name: &str,
        cwd: &Path,
        cmd: &str,
        env: &[(String, String)],
    ) -> Result<(), SessionError> {
        // Precondition: cwd must exist
        if !cwd.exists() {
            return Err(SessionError::SpawnFailed(format!(
                "working directory does not exist: {}",
                cwd.display()
            )));
        }

        // A leftover session with the same name is stale; kill it first
        let existing = tmux(&["has-session", "-t", name], "tmux has-session").await;
        if existing.map(|o| o.status.success()).unwrap_or(false) {
            tracing::warn!(session = name, "session already exists, killing first");
            let _ = tmux(&["kill-session", "-t", name], "tmux kill-session").await;
        }

        let mut tmux_cmd = Command::new("tmux");
        tmux_cmd
            .arg("new-session")
            .arg("-d")
            .arg("-s")
            .arg(name)
            .arg("-c")
            .arg(cwd);

        for (key, value) in env {
            tmux_cmd.arg("-e").arg(format!("{}={}", key, value));
        }

        tmux_cmd.arg(cmd);

        let output = run_with_timeout(tmux_cmd, TMUX_TIMEOUT, "tmux new-session")
            .await
            .map_err(SessionError::SpawnFailed)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(session = name, stderr = %stderr, "tmux spawn failed");
            return Err(SessionError::SpawnFailed(stderr.to_string()));
        }

        // Log stderr even on success - may contain useful warnings
        if !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(session = name, stderr = %stderr, "tmux spawn stderr (non-fatal)");
        }

        Ok(())
    }

    async fn send_keys(&self, name: &str, text: &str) -> Result<(), SessionError> {
        // -l = literal mode (no key name interpretation)
        // -- = end of options (handles text starting with -)
        let output = tmux(
            &["send-keys", "-t", name, "-l", "--", text],
            "tmux send-keys",
        )
        .await?;
        if !output.status.success() {
            return Err(SessionError::NotFound(name.to_string()));
        }
        self.send_enter(name).await
    }

    async fn send_buffer(&self, name: &str, text: &str) -> Result<(), SessionError> {
        // Stage the text in a tmux paste buffer via stdin so arbitrary
        // content (quotes, newlines) survives intact.
        let mut load = Command::new("tmux")
            .args(["load-buffer", "-"])
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| SessionError::CommandFailed(e.to_string()))?;

        if let Some(mut stdin) = load.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| SessionError::CommandFailed(e.to_string()))?;
        }
        let status = load
            .wait()
            .await
            .map_err(|e| SessionError::CommandFailed(e.to_string()))?;
        if !status.success() {
            return Err(SessionError::CommandFailed(
                "tmux load-buffer failed".to_string(),
            ));
        }

        let output = tmux(
            &["paste-buffer", "-d", "-t", name],
            "tmux paste-buffer",
        )
        .await?;
        if !output.status.success() {
            return Err(SessionError::NotFound(name.to_string()));
        }
        Ok(())
    }

    async fn send_enter(&self, name: &str) -> Result<(), SessionError> {
        let output = tmux(&["send-keys", "-t", name, "Enter"], "tmux send-keys").await?;
        if !output.status.success() {
            return Err(SessionError::NotFound(name.to_string()));
        }
        Ok(())
    }

    async fn capture_pane(&self, name: &str, lines: u32) -> Result<String, SessionError> {
        let start = format!("-{}", lines);
        let output = tmux(
            &["capture-pane", "-t", name, "-p", "-S", &start],
            "tmux capture-pane",
        )
        .await?;
        if !output.status.success() {
            return Err(SessionError::NotFound(name.to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn has_session(&self, name: &str) -> Result<bool, SessionError> {
        let output = tmux(&["has-session", "-t", name], "tmux has-session").await?;
        Ok(output.status.success())
    }

    async fn kill_session(&self, name: &str) -> Result<(), SessionError> {
        // Session might already be dead, which is fine
        let _ = tmux(&["kill-session", "-t", name], "tmux kill-session").await?;
        Ok(())
    }
}
