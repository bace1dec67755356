// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tunable engine parameters.

use std::time::Duration;

/// Knobs for session handling and polling. Production uses the defaults;
/// tests shrink the delays.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Command started inside agent sessions
    pub agent_command: String,
    /// Binary the agent hooks invoke to log lifecycle events
    pub hook_command: String,
    /// Grace period after spawning a session before the first prompt
    pub boot_delay: Duration,
    /// Event-store poll interval while waiting for idle
    pub poll_interval: Duration,
    /// Settle time between a buffer paste and the submit key
    pub paste_settle: Duration,
    /// Prompts at or above this length (or containing newlines) use the
    /// buffer-paste path
    pub paste_threshold: usize,
    /// Scrollback lines captured per pane snapshot
    pub capture_lines: u32,
    /// Stage timeout when neither the stage nor defaults set one
    pub default_stage_timeout: Duration,
    /// Minimum gap between wrap-up steers of the same session
    pub steer_throttle: Duration,
    /// Check timeout when the check sets none
    pub default_check_timeout: Duration,
    /// Marker text present in the agent's idle prompt (pane fallback)
    pub idle_marker: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            agent_command: "claude".to_string(),
            hook_command: "factory".to_string(),
            boot_delay: Duration::from_secs(15),
            poll_interval: Duration::from_secs(30),
            paste_settle: Duration::from_secs(1),
            paste_threshold: 200,
            capture_lines: 200,
            default_stage_timeout: Duration::from_secs(30 * 60),
            steer_throttle: Duration::from_secs(10 * 60),
            default_check_timeout: Duration::from_secs(600),
            idle_marker: "? for shortcuts".to_string(),
        }
    }
}

impl EngineOptions {
    /// Fast options for tests: no boot delay, millisecond polling.
    pub fn fast() -> Self {
        Self {
            boot_delay: Duration::from_millis(1),
            poll_interval: Duration::from_millis(5),
            paste_settle: Duration::from_millis(1),
            ..Self::default()
        }
    }
}
