// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Default timeout for tmux commands.
pub const TMUX_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for git worktree operations.
pub const GIT_WORKTREE_TIMEOUT: Duration = Duration::from_secs(60);

/// Default timeout for hosting-service commands (gh, git push, rebase).
pub const HOST_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// Default timeout for a check command when the config sets none.
pub const CHECK_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

/// Default timeout for agent print-mode invocations.
pub const PRINT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Run a subprocess command with a timeout.
///
/// Wraps `Command::output()` with `tokio::time::timeout`, converting
/// timeout expiration into a descriptive error message. The child process
/// is killed automatically if the timeout elapses (via the tokio `Child`
/// drop implementation).
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, String> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(io_err)) => Err(format!("{} failed: {}", description, io_err)),
        Err(_elapsed) => Err(format!(
            "{} timed out after {}s",
            description,
            timeout.as_secs()
        )),
    }
}

/// Run a shell snippet under `bash -c` with strict mode, in a directory.
pub fn shell_command(script: &str, cwd: &std::path::Path) -> Command {
    let wrapped = format!("set -euo pipefail\n{script}");
    let mut cmd = Command::new("bash");
    cmd.arg("-c").arg(wrapped).current_dir(cwd);
    cmd
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
