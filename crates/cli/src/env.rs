// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate.

use std::path::PathBuf;

/// Resolve the state directory: FACTORY_HOME > ~/.factory
pub fn factory_home() -> anyhow::Result<PathBuf> {
    if let Ok(dir) = std::env::var("FACTORY_HOME") {
        return Ok(PathBuf::from(dir));
    }
    let home =
        std::env::var("HOME").map_err(|_| anyhow::anyhow!("neither FACTORY_HOME nor HOME set"))?;
    Ok(PathBuf::from(home).join(".factory"))
}

/// Agent command override for sessions and print mode.
pub fn agent_command() -> Option<String> {
    std::env::var("FACTORY_AGENT").ok().filter(|s| !s.is_empty())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
