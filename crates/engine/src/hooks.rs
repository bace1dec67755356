// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent hook installation.
//!
//! Writes lifecycle hooks into the worktree's `.claude/settings.local.json`
//! so the coding agent reports `active`/`idle`/`exited` back through the
//! `event log` subcommand. Existing keys in the settings file are preserved;
//! only `hooks` is replaced.

use serde_json::{json, Value};
use std::path::Path;

fn hook_entry(command: String) -> Value {
    json!([{ "hooks": [{ "type": "command", "command": command }] }])
}

/// Install session lifecycle hooks for one session into `worktree`.
pub fn write_hooks_file(
    worktree: &Path,
    hook_command: &str,
    session: &str,
    issue: u64,
    stage: &str,
) -> Result<(), std::io::Error> {
    let settings_dir = worktree.join(".claude");
    std::fs::create_dir_all(&settings_dir)?;
    let settings_path = settings_dir.join("settings.local.json");

    let mut settings: Value = match std::fs::read(&settings_path) {
        Ok(data) => serde_json::from_slice(&data).unwrap_or_else(|_| json!({})),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => json!({}),
        Err(e) => return Err(e),
    };

    let log = |event: &str| {
        format!(
            "{hook_command} event log --session {session} --issue {issue} --stage {stage} --event {event}"
        )
    };

    let hooks = json!({
        "UserPromptSubmit": hook_entry(log("active")),
        "Stop": hook_entry(log("idle")),
        "SessionEnd": hook_entry(log("exited")),
    });

    if let Some(obj) = settings.as_object_mut() {
        obj.insert("hooks".to_string(), hooks);
    } else {
        settings = json!({ "hooks": hooks });
    }

    let data = serde_json::to_vec_pretty(&settings)?;
    std::fs::write(&settings_path, data)?;
    Ok(())
}

#[cfg(test)]
#[path = "hooks_tests.rs"]
mod tests;
