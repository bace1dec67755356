// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory session adapter for tests.

use super::{SessionAdapter, SessionError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A recorded call against the fake adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    New { name: String, cmd: String },
    SendKeys { name: String, text: String },
    SendBuffer { name: String, text: String },
    SendEnter { name: String },
    Kill { name: String },
}

/// One fake session's state.
#[derive(Debug, Clone, Default)]
pub struct FakeSession {
    pub cwd: PathBuf,
    pub alive: bool,
    /// Sequence of pane snapshots returned by successive capture calls;
    /// the last entry repeats once the sequence is exhausted.
    pub pane_frames: Vec<String>,
    pub capture_count: usize,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, FakeSession>,
    calls: Vec<SessionCall>,
    fail_next_spawn: bool,
}

/// Deterministic in-memory [`SessionAdapter`].
#[derive(Clone, Default)]
pub struct FakeSessionAdapter {
    inner: Arc<Mutex<Inner>>,
}

impl FakeSessionAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-register a live session without going through `new_session`.
    pub fn add_session(&self, name: &str) {
        self.inner.lock().sessions.insert(
            name.to_string(),
            FakeSession {
                alive: true,
                ..FakeSession::default()
            },
        );
    }

    /// Queue pane content frames for a session.
    pub fn set_pane_frames(&self, name: &str, frames: Vec<String>) {
        let mut inner = self.inner.lock();
        let session = inner.sessions.entry(name.to_string()).or_default();
        session.alive = true;
        session.pane_frames = frames;
        session.capture_count = 0;
    }

    /// Make the next spawn fail (multiplexer unreachable).
    pub fn fail_next_spawn(&self) {
        self.inner.lock().fail_next_spawn = true;
    }

    /// All calls recorded so far.
    pub fn calls(&self) -> Vec<SessionCall> {
        self.inner.lock().calls.clone()
    }

    /// Text of every send (keys or buffer) to a session, in order.
    pub fn sent_text(&self, name: &str) -> Vec<String> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                SessionCall::SendKeys { name: n, text } if n == name => Some(text.clone()),
                SessionCall::SendBuffer { name: n, text } if n == name => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn is_alive(&self, name: &str) -> bool {
        self.inner
            .lock()
            .sessions
            .get(name)
            .map(|s| s.alive)
            .unwrap_or(false)
    }
}

#[async_trait]
impl SessionAdapter for FakeSessionAdapter {
    async fn new_session(
        &self,
        name: &str,
        cwd: &Path,
        cmd: &str,
        _env: &[(String, String)],
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        if inner.fail_next_spawn {
            inner.fail_next_spawn = false;
            return Err(SessionError::SpawnFailed("fake spawn failure".to_string()));
        }
        inner.calls.push(SessionCall::New {
            name: name.to_string(),
            cmd: cmd.to_string(),
        });
        // Respawning keeps any scripted pane frames so tests can stage
        // output before the session exists.
        let session = inner.sessions.entry(name.to_string()).or_default();
        session.cwd = cwd.to_path_buf();
        session.alive = true;
        session.capture_count = 0;
        Ok(())
    }

    async fn send_keys(&self, name: &str, text: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        if !inner.sessions.contains_key(name) {
            return Err(SessionError::NotFound(name.to_string()));
        }
        inner.calls.push(SessionCall::SendKeys {
            name: name.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_buffer(&self, name: &str, text: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        if !inner.sessions.contains_key(name) {
            return Err(SessionError::NotFound(name.to_string()));
        }
        inner.calls.push(SessionCall::SendBuffer {
            name: name.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_enter(&self, name: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        if !inner.sessions.contains_key(name) {
            return Err(SessionError::NotFound(name.to_string()));
        }
        inner.calls.push(SessionCall::SendEnter {
            name: name.to_string(),
        });
        Ok(())
    }

    async fn capture_pane(&self, name: &str, _lines: u32) -> Result<String, SessionError> {
        let mut inner = self.inner.lock();
        let session = inner
            .sessions
            .get_mut(name)
            .ok_or_else(|| SessionError::NotFound(name.to_string()))?;
        if session.pane_frames.is_empty() {
            return Ok(String::new());
        }
        let idx = session.capture_count.min(session.pane_frames.len() - 1);
        session.capture_count += 1;
        Ok(session.pane_frames[idx].clone())
    }

    async fn has_session(&self, name: &str) -> Result<bool, SessionError> {
        Ok(self.is_alive(name))
    }

    async fn kill_session(&self, name: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::Kill {
            name: name.to_string(),
        });
        if let Some(session) = inner.sessions.get_mut(name) {
            session.alive = false;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
