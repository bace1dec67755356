// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Triage runner.
//!
//! Classifies issues through a linear stage list before they enter the dev
//! queue. Stages run either async (multiplexer session + outcome file,
//! polled by the tick) or print (one-shot subprocess, synchronous within
//! the tick). Strictly serial: one triage in progress at a time, guarded
//! cross-process by the `.advance.lock` file.

use crate::hooks::write_hooks_file;
use crate::orchestrator::TriageAdvance;
use crate::prompt::render_prompt;
use crate::{EngineError, EngineOptions};
use chrono::Utc;
use factory_adapters::{HostAdapter, PrintRunner, SessionAdapter};
use factory_config::{TriageConfig, TriageMode, TriageStageDef};
use factory_core::{
    triage_session_name, validate_session_name, SessionEventKind, TickAction, TickActionKind,
    TriageOutcome, TriageStageRecord, TriageState, TriageStatus,
};
use factory_storage::{EventStore, TriageStore};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Drives the triage state machine.
pub struct TriageRunner<S, R, H>
where
    S: SessionAdapter,
    R: PrintRunner,
    H: HostAdapter,
{
    store: Arc<TriageStore>,
    events: Arc<EventStore>,
    sessions: S,
    agent: R,
    hosts: H,
    config: TriageConfig,
    config_dir: PathBuf,
    /// Directory triage sessions and print runs execute in
    workdir: PathBuf,
    opts: EngineOptions,
}

impl<S, R, H> TriageRunner<S, R, H>
where
    S: SessionAdapter,
    R: PrintRunner,
    H: HostAdapter,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<TriageStore>,
        events: Arc<EventStore>,
        sessions: S,
        agent: R,
        hosts: H,
        config: TriageConfig,
        config_dir: impl Into<PathBuf>,
        workdir: impl Into<PathBuf>,
        opts: EngineOptions,
    ) -> Self {
        Self {
            store,
            events,
            sessions,
            agent,
            hosts,
            config,
            config_dir: config_dir.into(),
            workdir: workdir.into(),
            opts,
        }
    }

    /// Save a pending triage and start it if nothing else is in progress.
    pub async fn enqueue(
        &self,
        issue: u64,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Vec<TickAction>, EngineError> {
        let first = self
            .config
            .first_stage()
            .ok_or(factory_config::ConfigError::NoTriageStages)?;

        self.store.put(&TriageState {
            issue,
            repo: self.config.repo.clone(),
            current_stage: first.id.clone(),
            status: TriageStatus::Pending,
            current_session: String::new(),
            stage_history: Vec::new(),
            updated_at: Utc::now(),
            title: title.into(),
            body: body.into(),
        })?;

        // Promotion happens inside advance, which also enforces the
        // one-in-progress rule.
        self.advance_inner().await
    }

    /// Bounded, lock-guarded advance; the tick calls this every cycle.
    pub async fn advance_inner(&self) -> Result<Vec<TickAction>, EngineError> {
        let Some(_lock) = self.store.try_advance_lock()? else {
            return Ok(Vec::new());
        };

        let mut actions = Vec::new();
        loop {
            let state = match self.store.in_progress()? {
                Some(state) => state,
                None => {
                    let Some(pending) = self.store.first_pending()? else {
                        break;
                    };
                    self.store
                        .update(pending.issue, |s| s.status = TriageStatus::InProgress)?;
                    continue;
                }
            };

            let stage = self
                .config
                .stage(&state.current_stage)
                .ok_or_else(|| EngineError::UnknownTriageStage {
                    issue: state.issue,
                    stage: state.current_stage.clone(),
                })?
                .clone();

            match stage.mode {
                TriageMode::Print => {
                    let action = self.run_print_stage(&state, &stage).await?;
                    actions.push(action);
                    // Print stages may chain; keep looping
                }
                TriageMode::Async => {
                    if let Some(action) = self.step_async_stage(&state, &stage).await? {
                        actions.push(action);
                    }
                    // At most one async transition per advance
                    break;
                }
            }
        }
        Ok(actions)
    }

    /// Run a print stage synchronously and route its outcome.
    async fn run_print_stage(
        &self,
        state: &TriageState,
        stage: &TriageStageDef,
    ) -> Result<TickAction, EngineError> {
        let issue = state.issue;
        tracing::info!(issue, stage = %stage.id, "running print triage stage");

        let vars = self.prompt_vars(state, stage);
        let prompt = render_prompt(&self.config_dir, stage.prompt_template.as_deref(), &vars)?;
        let stdout = self.agent.run_print(&prompt, &self.workdir).await?;

        let outcome = parse_print_outcome(&stdout).unwrap_or_else(|| TriageOutcome {
            outcome: "unknown".to_string(),
            summary: "no outcome object in agent output".to_string(),
        });
        // Audit trail even for synchronous stages
        self.store.write_outcome(issue, &stage.id, &outcome)?;

        if outcome.outcome == "yes" {
            if let Some(label) = &stage.label {
                if let Err(e) = self.hosts.add_label(issue, label).await {
                    tracing::warn!(issue, label, error = %e, "label application failed");
                }
            }
        }

        self.route(state, stage, &outcome)?;
        Ok(TickAction::new(
            issue,
            TickActionKind::Advanced,
            format!("{} -> {}", stage.id, outcome.outcome),
        ))
    }

    /// One transition of an async stage: start its session, or consume its
    /// outcome file once the session is idle.
    async fn step_async_stage(
        &self,
        state: &TriageState,
        stage: &TriageStageDef,
    ) -> Result<Option<TickAction>, EngineError> {
        let issue = state.issue;

        if state.current_session.is_empty() {
            let session = self.start_async_session(state, stage).await?;
            return Ok(Some(TickAction::new(
                issue,
                TickActionKind::Advanced,
                format!("started triage session {session}"),
            )));
        }

        let session = state.current_session.as_str();
        let settled = matches!(
            self.events.get_session_state(session)?,
            Some(ref ev) if matches!(ev.event, SessionEventKind::Idle | SessionEventKind::Exited)
        );
        if !settled {
            return Ok(None);
        }

        let Some(outcome) = self.store.read_outcome(issue, &stage.id)? else {
            // Agent stopped without writing the outcome; a later advance
            // retries once the file appears, a human can intervene meanwhile
            tracing::warn!(issue, stage = %stage.id, "session idle but no outcome file yet");
            return Ok(None);
        };

        let _ = self.sessions.kill_session(session).await;
        self.route(state, stage, &outcome)?;
        Ok(Some(TickAction::new(
            issue,
            TickActionKind::Advanced,
            format!("{} -> {}", stage.id, outcome.outcome),
        )))
    }

    async fn start_async_session(
        &self,
        state: &TriageState,
        stage: &TriageStageDef,
    ) -> Result<String, EngineError> {
        let issue = state.issue;
        let session = triage_session_name(issue, &stage.id);
        validate_session_name(&session)?;

        let alive = self.sessions.has_session(&session).await.unwrap_or(false);
        if alive {
            let _ = self.sessions.kill_session(&session).await;
        }

        self.sessions
            .new_session(&session, &self.workdir, &self.opts.agent_command, &[])
            .await?;
        self.store
            .update(issue, |s| s.current_session = session.clone())?;
        self.events.log_session_event(
            &session,
            issue,
            &stage.id,
            SessionEventKind::Started,
            None,
            None,
        )?;
        write_hooks_file(&self.workdir, &self.opts.hook_command, &session, issue, &stage.id)?;
        tokio::time::sleep(self.opts.boot_delay).await;

        let vars = self.prompt_vars(state, stage);
        let prompt = render_prompt(&self.config_dir, stage.prompt_template.as_deref(), &vars)?;

        self.events.log_session_event(
            &session,
            issue,
            &stage.id,
            SessionEventKind::FactorySend,
            None,
            None,
        )?;
        if prompt.contains('\n') || prompt.len() >= self.opts.paste_threshold {
            self.sessions.send_buffer(&session, &prompt).await?;
            tokio::time::sleep(self.opts.paste_settle).await;
            self.sessions.send_enter(&session).await?;
        } else {
            self.sessions.send_keys(&session, &prompt).await?;
        }
        Ok(session)
    }

    /// Record the stage outcome and either route onward or complete.
    fn route(
        &self,
        state: &TriageState,
        stage: &TriageStageDef,
        outcome: &TriageOutcome,
    ) -> Result<(), EngineError> {
        let record = TriageStageRecord {
            stage: stage.id.clone(),
            outcome: outcome.outcome.clone(),
            finished_at: Utc::now(),
        };

        match stage.route(&outcome.outcome) {
            Some(next) => {
                let next = next.to_string();
                self.store.update(state.issue, |s| {
                    s.stage_history.push(record);
                    s.current_stage = next.clone();
                    s.current_session.clear();
                })?;
            }
            None => {
                self.store.update(state.issue, |s| {
                    s.stage_history.push(record);
                    s.current_session.clear();
                    s.status = TriageStatus::Completed;
                })?;
                tracing::info!(issue = state.issue, "triage completed");
            }
        }
        Ok(())
    }

    fn prompt_vars(
        &self,
        state: &TriageState,
        stage: &TriageStageDef,
    ) -> HashMap<String, String> {
        let outcome_file = self.store.outcome_path(state.issue, &stage.id);
        let mut vars = HashMap::new();
        vars.insert("issue_number".to_string(), state.issue.to_string());
        vars.insert("issue_title".to_string(), state.title.clone());
        vars.insert("issue_body".to_string(), state.body.clone());
        vars.insert(
            "repo_root".to_string(),
            self.workdir.display().to_string(),
        );
        vars.insert(
            "outcome_file".to_string(),
            outcome_file.display().to_string(),
        );
        vars.insert("stage_id".to_string(), stage.id.clone());
        vars
    }
}

#[async_trait::async_trait]
impl<S, R, H> TriageAdvance for TriageRunner<S, R, H>
where
    S: SessionAdapter,
    R: PrintRunner,
    H: HostAdapter,
{
    async fn advance(&self) -> Result<Vec<TickAction>, EngineError> {
        self.advance_inner().await
    }
}

/// Last JSON object in print-mode stdout that carries a non-empty
/// `outcome` field.
pub fn parse_print_outcome(stdout: &str) -> Option<TriageOutcome> {
    let mut found = None;
    for line in stdout.lines() {
        let trimmed = line.trim();
        if !trimmed.starts_with('{') {
            continue;
        }
        if let Ok(outcome) = serde_json::from_str::<TriageOutcome>(trimmed) {
            if !outcome.outcome.is_empty() {
                found = Some(outcome);
            }
        }
    }
    if found.is_none() {
        // The whole output may be one pretty-printed object
        if let Ok(outcome) = serde_json::from_str::<TriageOutcome>(stdout.trim()) {
            if !outcome.outcome.is_empty() {
                found = Some(outcome);
            }
        }
    }
    found
}

#[cfg(test)]
#[path = "triage_tests.rs"]
mod tests;
