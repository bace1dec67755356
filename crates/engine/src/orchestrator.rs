// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator: single-shot pipeline operations.
//!
//! Every mutation of a pipeline funnels through the operations here:
//! `create`, `advance`, `retry`, `fail`, `abort`, `cleanup`. The periodic
//! tick lives in `tick.rs` as a second impl block.

use crate::intent::IntentModel;
use crate::merge::run_merge;
use crate::stage::{RunResult, StageEngine};
use crate::{EngineError, EngineOptions};
use factory_adapters::subprocess::{run_with_timeout, shell_command, CHECK_COMMAND_TIMEOUT};
use factory_adapters::{HostAdapter, NotifyAdapter, SessionAdapter, WorktreeAdapter};
use factory_config::{OnFail, PipelineConfig, StageDef, StageType};
use factory_core::pipeline::MAX_ATTEMPTS;
use factory_core::{
    Clock, PipelineState, PipelineStatus, QueueStatus, StageHistoryEntry, StageOutcome,
    SystemClock, TickAction,
};
use factory_storage::{EventStore, PipelineStore, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// What an `advance` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceAction {
    /// Pipeline is (or already was) completed
    Completed,
    /// Moved to the next stage
    StageAdvanced,
    /// Same stage will be re-attempted
    Retry,
    /// Routed to another stage via on_fail
    Routed,
    /// Pipeline is (or already was) failed
    Failed,
    /// Escalated to a human (blocked)
    Escalated,
    /// Rate limited; a later tick re-attempts
    RateLimited,
}

/// Result of a single `advance` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceResult {
    pub issue: u64,
    pub action: AdvanceAction,
    pub stage: String,
    #[serde(default)]
    pub message: String,
}

impl AdvanceResult {
    fn new(issue: u64, action: AdvanceAction, stage: &str, message: impl Into<String>) -> Self {
        Self {
            issue,
            action,
            stage: stage.to_string(),
            message: message.into(),
        }
    }
}

/// Shared dependencies for the orchestrator.
pub struct OrchestratorDeps<S, H, W, N, C = SystemClock> {
    pub events: Arc<EventStore>,
    pub states: Arc<PipelineStore>,
    pub sessions: S,
    pub hosts: H,
    pub worktrees: W,
    pub notifier: N,
    pub clock: C,
}

/// Advances triage as part of the tick (implemented by `TriageRunner`).
#[async_trait::async_trait]
pub trait TriageAdvance: Send + Sync {
    async fn advance(&self) -> Result<Vec<TickAction>, EngineError>;
}

/// The stage-orchestration engine's decision layer.
pub struct Orchestrator<S, H, W, N, C = SystemClock>
where
    S: SessionAdapter,
    H: HostAdapter,
    W: WorktreeAdapter,
    N: NotifyAdapter,
    C: Clock,
{
    pub(crate) events: Arc<EventStore>,
    pub(crate) states: Arc<PipelineStore>,
    pub(crate) engine: StageEngine<S>,
    pub(crate) sessions: S,
    pub(crate) hosts: H,
    pub(crate) worktrees: W,
    pub(crate) notifier: N,
    pub(crate) clock: C,
    pub(crate) config: PipelineConfig,
    pub(crate) config_dir: PathBuf,
    pub(crate) repo_dir: PathBuf,
    pub(crate) opts: EngineOptions,
    pub(crate) intent: Option<Arc<dyn IntentModel>>,
    pub(crate) triage: Option<Arc<dyn TriageAdvance>>,
}

impl<S, H, W, N, C> Orchestrator<S, H, W, N, C>
where
    S: SessionAdapter,
    H: HostAdapter,
    W: WorktreeAdapter,
    N: NotifyAdapter,
    C: Clock,
{
    pub fn new(
        deps: OrchestratorDeps<S, H, W, N, C>,
        config: PipelineConfig,
        config_dir: impl Into<PathBuf>,
        repo_dir: impl Into<PathBuf>,
        opts: EngineOptions,
    ) -> Self {
        let engine = StageEngine::new(
            Arc::clone(&deps.events),
            Arc::clone(&deps.states),
            deps.sessions.clone(),
            opts.clone(),
        );
        Self {
            events: deps.events,
            states: deps.states,
            engine,
            sessions: deps.sessions,
            hosts: deps.hosts,
            worktrees: deps.worktrees,
            notifier: deps.notifier,
            clock: deps.clock,
            config,
            config_dir: config_dir.into(),
            repo_dir: repo_dir.into(),
            opts,
            intent: None,
            triage: None,
        }
    }

    /// Attach a feature-intent model for queue auto-derivation.
    pub fn with_intent_model(mut self, model: Arc<dyn IntentModel>) -> Self {
        self.intent = Some(model);
        self
    }

    /// Attach a triage runner advanced by every tick.
    pub fn with_triage(mut self, triage: Arc<dyn TriageAdvance>) -> Self {
        self.triage = Some(triage);
        self
    }

    /// The effective config for a pipeline: its `config_path` if set,
    /// otherwise the global one.
    pub(crate) fn effective_config(
        &self,
        state: &PipelineState,
    ) -> Result<PipelineConfig, EngineError> {
        match &state.config_path {
            Some(path) => Ok(PipelineConfig::load(path)?),
            None => Ok(self.config.clone()),
        }
    }

    /// Create a pipeline for an issue: worktree, setup commands, initial
    /// state document. The worktree is rolled back on any later failure.
    pub async fn create(
        &self,
        issue_number: i64,
        feature_intent: Option<String>,
        config_path: Option<PathBuf>,
    ) -> Result<PipelineState, EngineError> {
        let issue = factory_core::validate_issue(issue_number)?;
        let config = match &config_path {
            Some(path) => PipelineConfig::load(path)?,
            None => self.config.clone(),
        };

        let issue_doc = self.hosts.get_issue(issue).await?;
        let branch = sanitize_branch(&format!("feature/issue-{issue}"));
        let worktree = self.worktrees.create(issue, &branch).await?;

        let result = self
            .create_inner(issue, &config, config_path, feature_intent, issue_doc, &branch, &worktree)
            .await;
        if result.is_err() {
            let _ = self.worktrees.remove(&worktree).await;
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn create_inner(
        &self,
        issue: u64,
        config: &PipelineConfig,
        config_path: Option<PathBuf>,
        feature_intent: Option<String>,
        issue_doc: factory_core::Issue,
        branch: &str,
        worktree: &std::path::Path,
    ) -> Result<PipelineState, EngineError> {
        for setup in &config.setup {
            tracing::info!(issue, command = %setup, "running setup command");
            let cmd = shell_command(setup, worktree);
            let output = run_with_timeout(cmd, CHECK_COMMAND_TIMEOUT, "setup")
                .await
                .map_err(EngineError::SetupFailed)?;
            if !output.status.success() {
                return Err(EngineError::SetupFailed(format!(
                    "{setup}: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                )));
            }
        }

        let first = config
            .first_stage()
            .ok_or(factory_config::ConfigError::NoStages)?;

        let mut state = PipelineState::new(
            issue,
            issue_doc.title.clone(),
            branch,
            worktree.to_path_buf(),
            self.repo_dir.clone(),
            &first.id,
        )
        .with_goal_gates(config.goal_gate_stages());
        state.config_path = config_path;
        state.namespace = config.repo.clone();
        state.feature_intent = feature_intent.unwrap_or_default();

        self.states.create(&state)?;
        self.states.cache_issue(&issue_doc)?;
        self.events
            .log_pipeline_event(issue, "created", Some(&first.id), None, None)?;
        tracing::info!(issue, branch, "pipeline created");
        Ok(state)
    }

    /// Execute one step of the pipeline: run the current stage and apply
    /// the success/failure routing.
    pub async fn advance(&self, issue: u64) -> Result<AdvanceResult, EngineError> {
        let state = self.states.get(issue)?;

        match state.status {
            PipelineStatus::Completed => {
                return Ok(AdvanceResult::new(
                    issue,
                    AdvanceAction::Completed,
                    &state.current_stage,
                    "already completed",
                ));
            }
            PipelineStatus::Failed => {
                return Ok(AdvanceResult::new(
                    issue,
                    AdvanceAction::Failed,
                    &state.current_stage,
                    "already failed",
                ));
            }
            PipelineStatus::Blocked => {
                return Ok(AdvanceResult::new(
                    issue,
                    AdvanceAction::Escalated,
                    &state.current_stage,
                    "blocked; awaiting a human decision",
                ));
            }
            _ => {}
        }

        let config = self.effective_config(&state)?;
        let stage = config
            .stage(&state.current_stage)
            .ok_or_else(|| EngineError::UnknownStage {
                issue,
                stage: state.current_stage.clone(),
            })?
            .clone();

        let state = self
            .states
            .update(issue, |s| s.status = PipelineStatus::InProgress)?;
        let timeout = config.stage_timeout(&stage, self.opts.default_stage_timeout);

        let run = self.run_stage(&state, &stage, &config, timeout).await;
        let result = match run {
            Ok(result) => result,
            Err(e) => {
                // Leave the pipeline retryable for the next tick
                let _ = self
                    .states
                    .update(issue, |s| s.status = PipelineStatus::Pending);
                return Err(e);
            }
        };

        if result.outcome == StageOutcome::RateLimited {
            self.states
                .update(issue, |s| s.status = PipelineStatus::RateLimited)?;
            self.events.log_pipeline_event(
                issue,
                "rate_limited",
                Some(&stage.id),
                Some(state.current_attempt),
                None,
            )?;
            let _ = self
                .notifier
                .notify(
                    "factory: rate limited",
                    &format!("issue #{issue} paused at {}", stage.id),
                )
                .await;
            return Ok(AdvanceResult::new(
                issue,
                AdvanceAction::RateLimited,
                &stage.id,
                "provider rate limit",
            ));
        }

        let entry = StageHistoryEntry {
            stage: stage.id.clone(),
            attempt: state.current_attempt,
            outcome: result.outcome,
            duration_ms: result.total_duration_ms,
            fix_rounds: result.fix_rounds,
            checks_first_pass: result.checks_first_pass,
        };
        let state = self.states.update(issue, |s| {
            s.push_history(entry);
            if stage.goal_gate && result.outcome == StageOutcome::Success {
                s.satisfy_goal_gate(&stage.id);
            }
        })?;
        self.write_checkpoint(&state, &stage, &result);

        if result.outcome == StageOutcome::Success {
            self.advance_to_next_stage(issue, &config, &stage).await
        } else {
            self.handle_stage_failure(issue, &config, &stage, &state).await
        }
    }

    /// Run the stage body: merge stages via the merge routine, everything
    /// else via the stage engine.
    async fn run_stage(
        &self,
        state: &PipelineState,
        stage: &StageDef,
        config: &PipelineConfig,
        timeout: std::time::Duration,
    ) -> Result<RunResult, EngineError> {
        if stage.stage_type == StageType::Merge {
            let started = Instant::now();
            let outcome =
                run_merge(&self.hosts, &self.worktrees, state, stage.merge_strategy).await?;
            if outcome == StageOutcome::Success {
                // Post-merge hook: expose queued dependents to later stages
                let dependents: Vec<String> = self
                    .events
                    .queue_dependents(state.issue)?
                    .iter()
                    .map(|e| e.issue.to_string())
                    .collect();
                self.states.update(state.issue, |s| {
                    s.runtime_vars
                        .insert("dependent_issues".to_string(), dependents.join(", "));
                })?;
            }
            return Ok(RunResult {
                outcome,
                stage: stage.id.clone(),
                attempt: state.current_attempt,
                session: String::new(),
                fix_rounds: 0,
                checks_first_pass: 0,
                final_check_state: BTreeMap::new(),
                auto_fixes: BTreeMap::new(),
                agent_fixes: BTreeMap::new(),
                total_duration_ms: started.elapsed().as_millis() as u64,
            });
        }

        self.engine
            .run(state, stage, config, &self.config_dir, timeout)
            .await
    }

    /// Success branch: move to the linear successor, skipping the merge
    /// fallback stage and vacuous contract-check stages, or complete.
    async fn advance_to_next_stage(
        &self,
        issue: u64,
        config: &PipelineConfig,
        completed: &StageDef,
    ) -> Result<AdvanceResult, EngineError> {
        let state = self.states.get(issue)?;
        let mut next = config.next_stage(&completed.id);

        // A merge stage's on_fail target is its conflict-recovery stage;
        // after a successful merge it must not run.
        if completed.stage_type == StageType::Merge {
            if let OnFail::Named(fallback) = &completed.on_fail {
                while let Some(candidate) = next {
                    if &candidate.id == fallback {
                        next = config.next_stage(&candidate.id);
                    } else {
                        break;
                    }
                }
            }
        }

        while let Some(candidate) = next {
            if is_contract_check(candidate) && !self.has_dependents(&state) {
                tracing::info!(issue, stage = %candidate.id, "skipping vacuous contract-check stage");
                self.events.log_pipeline_event(
                    issue,
                    "stage_skipped",
                    Some(&candidate.id),
                    None,
                    Some("no dependent issues"),
                )?;
                next = config.next_stage(&candidate.id);
            } else {
                break;
            }
        }

        match next {
            None => {
                if let Some(gate) = state.unsatisfied_goal_gate() {
                    let message = format!("goal gate `{gate}` not satisfied");
                    let gate = gate.to_string();
                    self.states
                        .update(issue, |s| s.status = PipelineStatus::Failed)?;
                    self.events.log_pipeline_event(
                        issue,
                        "failed",
                        Some(&gate),
                        None,
                        Some(&message),
                    )?;
                    self.mark_queue(issue, QueueStatus::Failed);
                    return Ok(AdvanceResult::new(
                        issue,
                        AdvanceAction::Failed,
                        &completed.id,
                        message,
                    ));
                }

                self.states
                    .update(issue, |s| s.status = PipelineStatus::Completed)?;
                self.events
                    .log_pipeline_event(issue, "completed", None, None, None)?;
                self.mark_queue(issue, QueueStatus::Completed);
                tracing::info!(issue, "pipeline completed");
                Ok(AdvanceResult::new(
                    issue,
                    AdvanceAction::Completed,
                    &completed.id,
                    "",
                ))
            }
            Some(next_stage) => {
                self.states.update(issue, |s| s.enter_stage(&next_stage.id))?;
                self.events.log_pipeline_event(
                    issue,
                    "stage_advanced",
                    Some(&next_stage.id),
                    Some(1),
                    None,
                )?;
                Ok(AdvanceResult::new(
                    issue,
                    AdvanceAction::StageAdvanced,
                    &next_stage.id,
                    "",
                ))
            }
        }
    }

    /// Failure branch: route per the stage's `on_fail`.
    async fn handle_stage_failure(
        &self,
        issue: u64,
        config: &PipelineConfig,
        stage: &StageDef,
        state: &PipelineState,
    ) -> Result<AdvanceResult, EngineError> {
        match &stage.on_fail {
            OnFail::SameStage => {
                if state.current_attempt >= MAX_ATTEMPTS {
                    let message =
                        format!("stage {} failed after {} attempts", stage.id, state.current_attempt);
                    self.states
                        .update(issue, |s| s.status = PipelineStatus::Failed)?;
                    self.events.log_pipeline_event(
                        issue,
                        "failed",
                        Some(&stage.id),
                        Some(state.current_attempt),
                        Some(&message),
                    )?;
                    self.mark_queue(issue, QueueStatus::Failed);
                    let _ = self
                        .notifier
                        .notify("factory: pipeline failed", &format!("issue #{issue}: {message}"))
                        .await;
                    return Ok(AdvanceResult::new(issue, AdvanceAction::Failed, &stage.id, message));
                }

                let next_attempt = state.current_attempt + 1;
                self.states.update(issue, |s| {
                    s.current_attempt = next_attempt;
                    s.current_fix_round = 0;
                    s.current_session.clear();
                    s.status = PipelineStatus::Pending;
                })?;
                self.events.log_pipeline_event(
                    issue,
                    "retry",
                    Some(&stage.id),
                    Some(next_attempt),
                    None,
                )?;
                Ok(AdvanceResult::new(
                    issue,
                    AdvanceAction::Retry,
                    &stage.id,
                    format!("attempt {next_attempt}"),
                ))
            }

            OnFail::Escalate => {
                self.states
                    .update(issue, |s| s.status = PipelineStatus::Blocked)?;
                self.events.log_pipeline_event(
                    issue,
                    "escalated",
                    Some(&stage.id),
                    Some(state.current_attempt),
                    None,
                )?;
                let _ = self
                    .notifier
                    .notify(
                        "factory: decision needed",
                        &format!("issue #{issue} blocked at {}", stage.id),
                    )
                    .await;
                Ok(AdvanceResult::new(
                    issue,
                    AdvanceAction::Escalated,
                    &stage.id,
                    "escalated to human",
                ))
            }

            OnFail::Named(target) => {
                if config.stage(target).is_none() {
                    return Err(EngineError::UnknownStage {
                        issue,
                        stage: target.clone(),
                    });
                }
                self.states.update(issue, |s| s.enter_stage(target))?;
                self.events.log_pipeline_event(
                    issue,
                    "stage_routed",
                    Some(target),
                    Some(1),
                    Some(&format!("on_fail from {}", stage.id)),
                )?;
                Ok(AdvanceResult::new(
                    issue,
                    AdvanceAction::Routed,
                    target,
                    format!("routed from {}", stage.id),
                ))
            }
        }
    }

    /// Manual retry: bypasses the attempt ceiling.
    pub async fn retry(&self, issue: u64, reason: Option<&str>) -> Result<AdvanceResult, EngineError> {
        let state = self.states.get(issue)?;
        if state.status == PipelineStatus::Completed {
            return Err(EngineError::AlreadyCompleted(issue));
        }

        if !state.current_session.is_empty() {
            let _ = self.sessions.kill_session(&state.current_session).await;
        }

        let state = self.states.update(issue, |s| {
            s.current_attempt += 1;
            s.current_fix_round = 0;
            s.current_session.clear();
            s.status = PipelineStatus::InProgress;
        })?;
        self.events.log_pipeline_event(
            issue,
            "retry",
            Some(&state.current_stage),
            Some(state.current_attempt),
            Some(&format!("manual: {}", reason.unwrap_or("requested"))),
        )?;
        Ok(AdvanceResult::new(
            issue,
            AdvanceAction::Retry,
            &state.current_stage,
            format!("attempt {}", state.current_attempt),
        ))
    }

    /// Mark a pipeline failed, killing any session.
    pub async fn fail(&self, issue: u64, reason: Option<&str>) -> Result<(), EngineError> {
        let state = self.states.get(issue)?;
        if !state.current_session.is_empty() {
            let _ = self.sessions.kill_session(&state.current_session).await;
        }
        self.states.update(issue, |s| {
            s.current_session.clear();
            s.status = PipelineStatus::Failed;
        })?;
        self.events.log_pipeline_event(
            issue,
            "failed",
            Some(&state.current_stage),
            Some(state.current_attempt),
            reason,
        )?;
        self.mark_queue(issue, QueueStatus::Failed);
        Ok(())
    }

    /// Fail a pipeline and optionally remove its worktree.
    pub async fn abort(&self, issue: u64, remove_worktree: bool) -> Result<(), EngineError> {
        self.fail(issue, Some("aborted")).await?;
        if remove_worktree {
            let state = self.states.get(issue)?;
            self.worktrees.remove(&state.worktree).await?;
        }
        Ok(())
    }

    /// Remove all trace of a terminal pipeline.
    pub async fn cleanup(&self, issue: u64) -> Result<(), EngineError> {
        let state = self.states.get(issue)?;
        if !state.is_terminal() {
            return Err(EngineError::NotTerminal {
                issue,
                status: state.status.to_string(),
            });
        }

        if !state.current_session.is_empty() {
            let _ = self.sessions.kill_session(&state.current_session).await;
        }
        self.worktrees.remove(&state.worktree).await?;
        self.states.delete(issue)?;
        tracing::info!(issue, "pipeline cleaned up");
        Ok(())
    }

    /// Cleanup every completed and failed pipeline. Returns the issues
    /// cleaned.
    pub async fn cleanup_all(&self) -> Result<Vec<u64>, EngineError> {
        let mut cleaned = Vec::new();
        for state in self.states.list(None)? {
            if state.is_terminal() {
                self.cleanup(state.issue).await?;
                cleaned.push(state.issue);
            }
        }
        Ok(cleaned)
    }

    fn has_dependents(&self, state: &PipelineState) -> bool {
        state
            .runtime_vars
            .get("dependent_issues")
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false)
    }

    /// Best-effort queue status update; the issue may never have been
    /// queued.
    pub(crate) fn mark_queue(&self, issue: u64, status: QueueStatus) {
        match self.events.queue_update_status(issue, status) {
            Ok(()) | Err(StoreError::NotQueued(_)) => {}
            Err(e) => tracing::warn!(issue, error = %e, "queue status update failed"),
        }
    }

    fn write_checkpoint(&self, state: &PipelineState, stage: &StageDef, result: &RunResult) {
        let mut text = format!(
            "# {} attempt {}\n\noutcome: {}\nfix_rounds: {}\nchecks_first_pass: {}\n",
            stage.id, state.current_attempt, result.outcome, result.fix_rounds,
            result.checks_first_pass,
        );
        if !result.final_check_state.is_empty() {
            text.push_str("\n## checks\n");
            for (name, check_state) in &result.final_check_state {
                let _ = writeln!(text, "- {name}: {check_state}");
            }
        }
        if let Err(e) =
            self.states
                .write_checkpoint(state.issue, &stage.id, state.current_attempt, &text)
        {
            tracing::warn!(issue = state.issue, error = %e, "checkpoint write failed");
        }
    }
}

/// Is this stage the contract-check pattern (vacuous without dependents)?
fn is_contract_check(stage: &StageDef) -> bool {
    stage.id == "contract-check"
        || stage
            .prompt_template
            .as_deref()
            .map(|t| t.contains("contract-check"))
            .unwrap_or(false)
}

/// Restrict a branch name to safe characters.
pub(crate) fn sanitize_branch(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '/' | '_' | '-' | '.' => c,
            _ => '-',
        })
        .collect()
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
