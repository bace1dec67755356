// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Check-gate runner.
//!
//! Runs a stage's ordered check list: execute, parse, log, optionally
//! autofix and re-run once, stop on first failure unless told otherwise.

use crate::EngineError;
use chrono::Utc;
use factory_adapters::subprocess::{run_with_timeout, shell_command};
use factory_config::CheckDef;
use factory_core::check::CheckRun;
use factory_core::{CheckRecord, GateResult, RemainingFailure};
use factory_storage::EventStore;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cap on captured failure output.
const FINDINGS_CAP_BYTES: usize = 8 * 1024;

/// One gate invocation.
#[derive(Debug, Clone)]
pub struct GateSpec {
    pub issue: u64,
    pub stage: String,
    pub attempt: u32,
    pub fix_round: u32,
    pub continue_on_fail: bool,
    /// (name, definition) pairs in execution order
    pub checks: Vec<(String, CheckDef)>,
    /// Directory the commands run in (the worktree)
    pub cwd: PathBuf,
    /// Timeout for checks that set none
    pub default_timeout: Duration,
}

/// Runs gates and logs every check run into the event store.
pub struct GateRunner {
    events: Arc<EventStore>,
}

/// Outcome of one command execution.
struct CheckOutput {
    passed: bool,
    exit_code: i32,
    summary: String,
    findings: String,
}

impl GateRunner {
    pub fn new(events: Arc<EventStore>) -> Self {
        Self { events }
    }

    /// Run the full check list, returning the structured gate result.
    pub async fn run(&self, spec: &GateSpec) -> Result<GateResult, EngineError> {
        let mut result = GateResult::empty(spec.stage.clone(), spec.issue, spec.fix_round);

        for (name, def) in &spec.checks {
            let timeout = def.timeout_or(spec.default_timeout);
            let started = Instant::now();

            let mut output = self.execute(name, &def.command, def, spec, timeout).await;
            let mut auto_fixed = false;
            let mut runs = 1u32;

            if !output.passed && def.auto_fix {
                if let Some(fix_command) = &def.fix_command {
                    tracing::info!(issue = spec.issue, check = name, "running autofix");
                    let fix = shell_command(fix_command, &spec.cwd);
                    let _ = run_with_timeout(fix, timeout, &format!("fix:{name}")).await;

                    let rerun = self.execute(name, &def.command, def, spec, timeout).await;
                    runs = 2;
                    if rerun.passed {
                        auto_fixed = true;
                    }
                    output = rerun;
                }
            }

            let duration_ms = started.elapsed().as_millis() as u64;

            self.events.log_check_run(&CheckRun {
                issue: spec.issue,
                stage: spec.stage.clone(),
                attempt: spec.attempt,
                fix_round: spec.fix_round,
                check_name: name.clone(),
                passed: output.passed,
                auto_fixed,
                exit_code: output.exit_code,
                duration_ms,
                summary: output.summary.clone(),
                findings: output.findings.clone(),
                timestamp: Utc::now(),
            })?;

            let passed = output.passed;
            result.checks.push(CheckRecord {
                name: name.clone(),
                passed,
                auto_fixed,
                runs,
                exit_code: output.exit_code,
                duration_ms,
                summary: output.summary.clone(),
                findings: output.findings.clone(),
            });

            if !passed {
                result.remaining_failures.insert(
                    name.clone(),
                    RemainingFailure {
                        summary: output.summary,
                        findings: output.findings,
                    },
                );
                if !spec.continue_on_fail {
                    break;
                }
            }
        }

        result.passed = result.checks.iter().all(|c| c.passed);
        Ok(result)
    }

    /// Run one command and parse its output.
    async fn execute(
        &self,
        name: &str,
        command: &str,
        def: &CheckDef,
        spec: &GateSpec,
        timeout: Duration,
    ) -> CheckOutput {
        let cmd = shell_command(command, &spec.cwd);
        match run_with_timeout(cmd, timeout, name).await {
            Ok(output) => parse_output(&def.parser, name, &output),
            Err(message) => CheckOutput {
                passed: false,
                exit_code: -1,
                summary: message.clone(),
                findings: message,
            },
        }
    }
}

/// Parse command output via the named parser. `generic` (and anything
/// unknown) treats exit 0 as pass and captures the failure tail.
fn parse_output(parser: &str, name: &str, output: &std::process::Output) -> CheckOutput {
    if parser != "generic" {
        tracing::debug!(parser, check = name, "unknown parser, using generic");
    }
    generic_parse(name, output)
}

fn generic_parse(name: &str, output: &std::process::Output) -> CheckOutput {
    let exit_code = output.status.code().unwrap_or(-1);
    if output.status.success() {
        return CheckOutput {
            passed: true,
            exit_code,
            summary: String::new(),
            findings: String::new(),
        };
    }

    let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    CheckOutput {
        passed: false,
        exit_code,
        summary: format!("{name} failed with exit code {exit_code}"),
        findings: tail_capped(&combined, FINDINGS_CAP_BYTES),
    }
}

/// Keep the last `cap` bytes of text, marking truncation.
fn tail_capped(text: &str, cap: usize) -> String {
    let trimmed = text.trim_end();
    if trimmed.len() <= cap {
        return trimmed.to_string();
    }
    let mut start = trimmed.len() - cap;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    format!("…(truncated){}", &trimmed[start..])
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
