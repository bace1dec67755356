// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Desktop notification adapters.
//!
//! Fired when a pipeline escalates to a human or hits a rate limit, so an
//! operator notices without watching the tick output.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from notification delivery
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification failed: {0}")]
    Failed(String),
}

/// Adapter for operator-facing notifications.
#[async_trait]
pub trait NotifyAdapter: Clone + Send + Sync + 'static {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError>;
}

/// Desktop notifications via the platform notification service.
#[derive(Clone, Default)]
pub struct DesktopNotifyAdapter;

impl DesktopNotifyAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotifyAdapter for DesktopNotifyAdapter {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let title = title.to_string();
        let message = message.to_string();
        // notify-rust blocks on DBus; keep it off the async runtime
        tokio::task::spawn_blocking(move || {
            notify_rust::Notification::new()
                .summary(&title)
                .body(&message)
                .show()
                .map(|_| ())
                .map_err(|e| NotifyError::Failed(e.to_string()))
        })
        .await
        .map_err(|e| NotifyError::Failed(e.to_string()))?
    }
}

/// Notifier that does nothing (headless environments).
#[derive(Clone, Default)]
pub struct NoOpNotifyAdapter;

#[async_trait]
impl NotifyAdapter for NoOpNotifyAdapter {
    async fn notify(&self, _title: &str, _message: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Recording notifier for tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Default)]
pub struct FakeNotifyAdapter {
    sent: std::sync::Arc<parking_lot::Mutex<Vec<(String, String)>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeNotifyAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl NotifyAdapter for FakeNotifyAdapter {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .push((title.to_string(), message.to_string()));
        Ok(())
    }
}
