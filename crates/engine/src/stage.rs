// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage engine: executes one attempt of one stage.
//!
//! Agent stages acquire (or reuse) a multiplexer session, deliver the
//! prompt, wait for the agent to go idle, then drive the check+fix loop.
//! Checks-only stages run their gate once. Merge stages never reach this
//! engine; the orchestrator runs them directly.

use crate::gate::{GateRunner, GateSpec};
use crate::hooks::write_hooks_file;
use crate::prompt::{build_fix_prompt, render_prompt};
use crate::ratelimit::is_rate_limited;
use crate::{EngineError, EngineOptions};
use factory_adapters::SessionAdapter;
use factory_config::{PipelineConfig, StageDef, StageType};
use factory_core::{
    session_name, validate_session_name, CheckState, GateResult, PipelineState, SessionEventKind,
    StageOutcome,
};
use factory_storage::{EventStore, PipelineStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of one stage attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub outcome: StageOutcome,
    pub stage: String,
    pub attempt: u32,
    /// Session name used, empty for checks_only stages
    pub session: String,
    pub fix_rounds: u32,
    /// Checks that passed at round 0 without autofix
    pub checks_first_pass: u32,
    /// Check name → final state after the last round
    pub final_check_state: BTreeMap<String, CheckState>,
    /// Check name → autofix successes across rounds
    pub auto_fixes: BTreeMap<String, u32>,
    /// Check name → rounds in which the agent's edits flipped it to pass
    pub agent_fixes: BTreeMap<String, u32>,
    pub total_duration_ms: u64,
}

/// How a wait-for-idle ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitIdleResult {
    pub state: SessionEventKind,
    /// True when idleness was inferred from a stable pane snapshot
    pub pane_stable: bool,
    pub waited_ms: u64,
}

enum WaitOutcome {
    Settled(WaitIdleResult),
    TimedOut,
    RateLimited,
}

/// Executes stage attempts against a session adapter.
pub struct StageEngine<S: SessionAdapter> {
    events: Arc<EventStore>,
    states: Arc<PipelineStore>,
    sessions: S,
    gate: GateRunner,
    opts: EngineOptions,
}

impl<S: SessionAdapter> StageEngine<S> {
    pub fn new(
        events: Arc<EventStore>,
        states: Arc<PipelineStore>,
        sessions: S,
        opts: EngineOptions,
    ) -> Self {
        Self {
            gate: GateRunner::new(Arc::clone(&events)),
            events,
            states,
            sessions,
            opts,
        }
    }

    /// Execute one attempt of `stage` for the given pipeline state.
    pub async fn run(
        &self,
        state: &PipelineState,
        stage: &StageDef,
        config: &PipelineConfig,
        config_dir: &Path,
        timeout: Duration,
    ) -> Result<RunResult, EngineError> {
        let span = tracing::info_span!(
            "stage",
            issue = state.issue,
            stage = %stage.id,
            attempt = state.current_attempt
        );
        let _guard = span.enter();

        match stage.stage_type {
            StageType::ChecksOnly => self.run_checks_only(state, stage, config).await,
            StageType::Agent => {
                self.run_agent(state, stage, config, config_dir, timeout).await
            }
            StageType::Merge => Err(EngineError::MergeStage(stage.id.clone())),
        }
    }

    /// Checks-only stage: one gate run at fix_round 0, no session involved.
    async fn run_checks_only(
        &self,
        state: &PipelineState,
        stage: &StageDef,
        config: &PipelineConfig,
    ) -> Result<RunResult, EngineError> {
        let started = Instant::now();
        let result = self
            .gate
            .run(&self.gate_spec(state, stage, config, 0, false))
            .await?;

        let outcome = if result.passed {
            StageOutcome::Success
        } else {
            StageOutcome::Fail
        };
        Ok(RunResult {
            outcome,
            stage: stage.id.clone(),
            attempt: state.current_attempt,
            session: String::new(),
            fix_rounds: 0,
            checks_first_pass: count_first_pass(&result),
            final_check_state: final_state(stage, Some(&result)),
            auto_fixes: collect_auto_fixes(&result, BTreeMap::new()),
            agent_fixes: BTreeMap::new(),
            total_duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Agent stage: session, prompt, idle wait, fix loop.
    async fn run_agent(
        &self,
        state: &PipelineState,
        stage: &StageDef,
        config: &PipelineConfig,
        config_dir: &Path,
        timeout: Duration,
    ) -> Result<RunResult, EngineError> {
        let started = Instant::now();
        let deadline = started + timeout;
        let issue = state.issue;

        let session = self.acquire_session(state, stage, config).await?;

        let vars = self.prompt_vars(state, stage)?;
        let prompt = render_prompt(config_dir, stage.prompt_template.as_deref(), &vars)?;
        self.send_to_session(&session, &prompt, issue, &stage.id)
            .await?;

        let fail = |fix_rounds: u32, last: Option<&GateResult>, cfp: u32, af, agf| RunResult {
            outcome: StageOutcome::Fail,
            stage: stage.id.clone(),
            attempt: state.current_attempt,
            session: session.clone(),
            fix_rounds,
            checks_first_pass: cfp,
            final_check_state: final_state(stage, last),
            auto_fixes: af,
            agent_fixes: agf,
            total_duration_ms: started.elapsed().as_millis() as u64,
        };

        match self
            .wait_for_idle(&session, issue, &stage.id, deadline)
            .await?
        {
            WaitOutcome::Settled(_) => {}
            WaitOutcome::TimedOut => {
                tracing::warn!(issue, stage = %stage.id, "stage timed out waiting for idle");
                return Ok(fail(0, None, 0, BTreeMap::new(), BTreeMap::new()));
            }
            WaitOutcome::RateLimited => {
                return Ok(self.rate_limited_result(state, stage, &session, started));
            }
        }

        // Fix loop
        let mut round = 0u32;
        let mut result = self
            .gate
            .run(&self.gate_spec(state, stage, config, round, true))
            .await?;
        let checks_first_pass = count_first_pass(&result);
        let mut auto_fixes = collect_auto_fixes(&result, BTreeMap::new());
        let mut agent_fixes: BTreeMap<String, u32> = BTreeMap::new();
        let mut prev_failed: Vec<String> = failed_names(&result);

        while !result.passed && round < config.max_fix_rounds {
            round += 1;
            let fix_prompt = build_fix_prompt(&result.checks);
            self.send_to_session(&session, &fix_prompt, issue, &stage.id)
                .await?;

            match self
                .wait_for_idle(&session, issue, &stage.id, deadline)
                .await?
            {
                WaitOutcome::Settled(_) => {}
                WaitOutcome::TimedOut => {
                    tracing::warn!(issue, stage = %stage.id, round, "fix round timed out");
                    return Ok(fail(
                        round,
                        Some(&result),
                        checks_first_pass,
                        auto_fixes,
                        agent_fixes,
                    ));
                }
                WaitOutcome::RateLimited => {
                    return Ok(self.rate_limited_result(state, stage, &session, started));
                }
            }

            result = self
                .gate
                .run(&self.gate_spec(state, stage, config, round, true))
                .await?;
            auto_fixes = collect_auto_fixes(&result, auto_fixes);
            for record in &result.checks {
                if record.passed && !record.auto_fixed && prev_failed.contains(&record.name) {
                    *agent_fixes.entry(record.name.clone()).or_insert(0) += 1;
                }
            }
            prev_failed = failed_names(&result);
        }

        let outcome = if result.passed {
            StageOutcome::Success
        } else {
            StageOutcome::Fail
        };
        Ok(RunResult {
            outcome,
            stage: stage.id.clone(),
            attempt: state.current_attempt,
            session,
            fix_rounds: round,
            checks_first_pass,
            final_check_state: final_state(stage, Some(&result)),
            auto_fixes,
            agent_fixes,
            total_duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn rate_limited_result(
        &self,
        state: &PipelineState,
        stage: &StageDef,
        session: &str,
        started: Instant,
    ) -> RunResult {
        tracing::warn!(issue = state.issue, stage = %stage.id, "rate limit detected");
        RunResult {
            outcome: StageOutcome::RateLimited,
            stage: stage.id.clone(),
            attempt: state.current_attempt,
            session: session.to_string(),
            fix_rounds: 0,
            checks_first_pass: 0,
            final_check_state: final_state(stage, None),
            auto_fixes: BTreeMap::new(),
            agent_fixes: BTreeMap::new(),
            total_duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Reuse the recorded session when the multiplexer still has it and it
    /// has not exited; otherwise kill the stale reference and start fresh.
    async fn acquire_session(
        &self,
        state: &PipelineState,
        stage: &StageDef,
        config: &PipelineConfig,
    ) -> Result<String, EngineError> {
        let issue = state.issue;

        if !state.current_session.is_empty() {
            let alive = self
                .sessions
                .has_session(&state.current_session)
                .await
                .unwrap_or(false);
            let exited = matches!(
                self.events.get_session_state(&state.current_session)?,
                Some(ref ev) if ev.event == SessionEventKind::Exited
            );
            if alive && !exited {
                tracing::debug!(issue, session = %state.current_session, "reusing session");
                return Ok(state.current_session.clone());
            }
            let _ = self.sessions.kill_session(&state.current_session).await;
        }

        let name = session_name(issue, &stage.id);
        validate_session_name(&name)?;

        let mut command = self.opts.agent_command.clone();
        for flag in &config.defaults.flags {
            command.push(' ');
            command.push_str(flag);
        }
        if let Some(model) = &stage.model {
            command.push_str(" --model ");
            command.push_str(model);
        }

        self.sessions
            .new_session(&name, &state.worktree, &command, &[])
            .await?;
        self.states
            .update(issue, |s| s.current_session = name.clone())?;
        self.events
            .log_session_event(&name, issue, &stage.id, SessionEventKind::Started, None, None)?;
        write_hooks_file(
            &state.worktree,
            &self.opts.hook_command,
            &name,
            issue,
            &stage.id,
        )?;

        tokio::time::sleep(self.opts.boot_delay).await;
        Ok(name)
    }

    /// Log a factory_send and deliver text. Multiline or long prompts go
    /// through the buffer-paste path with a settle delay before Enter.
    async fn send_to_session(
        &self,
        session: &str,
        text: &str,
        issue: u64,
        stage: &str,
    ) -> Result<(), EngineError> {
        self.events.log_session_event(
            session,
            issue,
            stage,
            SessionEventKind::FactorySend,
            None,
            None,
        )?;

        if text.contains('\n') || text.len() >= self.opts.paste_threshold {
            self.sessions.send_buffer(session, text).await?;
            tokio::time::sleep(self.opts.paste_settle).await;
            self.sessions.send_enter(session).await?;
        } else {
            self.sessions.send_keys(session, text).await?;
        }
        Ok(())
    }

    /// Poll the event store until the session reports idle or exited.
    ///
    /// Fallback: a pane snapshot byte-identical to the previous poll that
    /// contains the idle marker promotes to a synthesized idle event (one
    /// capture per poll keeps capture traffic bounded).
    async fn wait_for_idle(
        &self,
        session: &str,
        issue: u64,
        stage: &str,
        deadline: Instant,
    ) -> Result<WaitOutcome, EngineError> {
        let started = Instant::now();
        let mut last_pane: Option<String> = None;

        loop {
            if let Some(event) = self.events.get_session_state(session)? {
                match event.event {
                    SessionEventKind::Idle | SessionEventKind::Exited => {
                        return Ok(WaitOutcome::Settled(WaitIdleResult {
                            state: event.event,
                            pane_stable: false,
                            waited_ms: started.elapsed().as_millis() as u64,
                        }));
                    }
                    _ => {}
                }
            }

            if let Ok(pane) = self
                .sessions
                .capture_pane(session, self.opts.capture_lines)
                .await
            {
                if is_rate_limited(&pane) {
                    return Ok(WaitOutcome::RateLimited);
                }
                let stable = last_pane.as_deref() == Some(pane.as_str());
                if stable && pane.contains(&self.opts.idle_marker) {
                    self.events.log_session_event(
                        session,
                        issue,
                        stage,
                        SessionEventKind::Idle,
                        None,
                        Some("pane_stable"),
                    )?;
                    return Ok(WaitOutcome::Settled(WaitIdleResult {
                        state: SessionEventKind::Idle,
                        pane_stable: true,
                        waited_ms: started.elapsed().as_millis() as u64,
                    }));
                }
                last_pane = Some(pane);
            }

            if Instant::now() >= deadline {
                return Ok(WaitOutcome::TimedOut);
            }
            tokio::time::sleep(self.opts.poll_interval).await;
        }
    }

    fn gate_spec(
        &self,
        state: &PipelineState,
        stage: &StageDef,
        config: &PipelineConfig,
        fix_round: u32,
        continue_on_fail: bool,
    ) -> GateSpec {
        GateSpec {
            issue: state.issue,
            stage: stage.id.clone(),
            attempt: state.current_attempt,
            fix_round,
            continue_on_fail,
            checks: config.stage_checks(stage),
            cwd: state.worktree.clone(),
            default_timeout: self.opts.default_check_timeout,
        }
    }

    fn prompt_vars(
        &self,
        state: &PipelineState,
        stage: &StageDef,
    ) -> Result<HashMap<String, String>, EngineError> {
        let issue_doc = self.states.cached_issue(state.issue)?;
        let outcome_file: PathBuf = self
            .states
            .issue_dir(state.issue)
            .join(format!("{}.outcome.json", stage.id));

        let mut vars = HashMap::new();
        vars.insert("issue_number".to_string(), state.issue.to_string());
        vars.insert(
            "issue_title".to_string(),
            issue_doc
                .as_ref()
                .map(|i| i.title.clone())
                .unwrap_or_else(|| state.title.clone()),
        );
        vars.insert(
            "issue_body".to_string(),
            issue_doc.map(|i| i.body).unwrap_or_default(),
        );
        vars.insert(
            "repo_root".to_string(),
            state.worktree.display().to_string(),
        );
        vars.insert(
            "outcome_file".to_string(),
            outcome_file.display().to_string(),
        );
        vars.insert("stage_id".to_string(), stage.id.clone());
        vars.insert("feature_intent".to_string(), state.feature_intent.clone());
        for (key, value) in &state.runtime_vars {
            vars.insert(key.clone(), value.clone());
        }
        Ok(vars)
    }
}

fn count_first_pass(result: &GateResult) -> u32 {
    if result.fix_round != 0 {
        return 0;
    }
    result
        .checks
        .iter()
        .filter(|c| c.passed && !c.auto_fixed)
        .count() as u32
}

fn failed_names(result: &GateResult) -> Vec<String> {
    result
        .checks
        .iter()
        .filter(|c| !c.passed)
        .map(|c| c.name.clone())
        .collect()
}

fn collect_auto_fixes(
    result: &GateResult,
    mut acc: BTreeMap<String, u32>,
) -> BTreeMap<String, u32> {
    for record in &result.checks {
        if record.auto_fixed {
            *acc.entry(record.name.clone()).or_insert(0) += 1;
        }
    }
    acc
}

/// Final per-check state: the last gate run's results, with configured
/// checks that never ran marked skipped.
fn final_state(stage: &StageDef, last: Option<&GateResult>) -> BTreeMap<String, CheckState> {
    let mut map = BTreeMap::new();
    for name in stage.check_names() {
        map.insert(name.clone(), CheckState::Skipped);
    }
    if let Some(result) = last {
        for record in &result.checks {
            let check_state = if record.passed {
                CheckState::Pass
            } else {
                CheckState::Fail
            };
            map.insert(record.name.clone(), check_state);
        }
    }
    map
}

#[cfg(test)]
#[path = "stage_tests.rs"]
mod tests;
