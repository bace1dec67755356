// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal-multiplexer session adapters

mod tmux;

pub use tmux::TmuxAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSession, FakeSessionAdapter, SessionCall};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors from session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
}

/// Adapter for managing terminal-multiplexer sessions.
///
/// Two input primitives exist deliberately: [`send_keys`] for single logical
/// lines and [`send_buffer`] for atomic multi-line pastes. The caller is
/// responsible for the settling delay between a paste and the submit key.
///
/// [`send_keys`]: SessionAdapter::send_keys
/// [`send_buffer`]: SessionAdapter::send_buffer
#[async_trait]
pub trait SessionAdapter: Clone + Send + Sync + 'static {
    /// Create a new detached session running `cmd` in `cwd`.
    async fn new_session(
        &self,
        name: &str,
        cwd: &Path,
        cmd: &str,
        env: &[(String, String)],
    ) -> Result<(), SessionError>;

    /// Send literal text to a session followed by Enter.
    async fn send_keys(&self, name: &str, text: &str) -> Result<(), SessionError>;

    /// Paste text into a session atomically via a buffer, without submitting.
    async fn send_buffer(&self, name: &str, text: &str) -> Result<(), SessionError>;

    /// Send the Enter key to a session.
    async fn send_enter(&self, name: &str) -> Result<(), SessionError>;

    /// Capture the visible pane contents plus scrollback tail.
    async fn capture_pane(&self, name: &str, lines: u32) -> Result<String, SessionError>;

    /// Check whether a session exists.
    async fn has_session(&self, name: &str) -> Result<bool, SessionError>;

    /// Kill a session (succeeds if already gone).
    async fn kill_session(&self, name: &str) -> Result<(), SessionError>;
}
