// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The periodic tick.
//!
//! `check_in` is invoked by an external scheduler. Per call it performs at
//! most one dev-pipeline action, pops the queue when nothing is active, and
//! advances triage. Correctness under concurrent invocations rests on the
//! one-pipeline-per-tick rule plus atomic state writes; a lost update
//! converges on a later tick.

use crate::orchestrator::Orchestrator;
use crate::{AdvanceAction, AdvanceResult, EngineError};
use factory_adapters::{HostAdapter, NotifyAdapter, SessionAdapter, WorktreeAdapter};
use factory_core::{
    Clock, PipelineState, PipelineStatus, QueueStatus, SessionEventKind, TickAction,
    TickActionKind,
};

/// Nudge sent to sessions that outlive their stage timeout.
const STEER_MESSAGE: &str =
    "Please wrap up: commit what works, note what remains, and stop.";

impl<S, H, W, N, C> Orchestrator<S, H, W, N, C>
where
    S: SessionAdapter,
    H: HostAdapter,
    W: WorktreeAdapter,
    N: NotifyAdapter,
    C: Clock,
{
    /// One tick: evaluate the first active pipeline, pop the queue when
    /// idle, then advance triage.
    pub async fn check_in(&self) -> Result<Vec<TickAction>, EngineError> {
        let mut actions = Vec::new();
        let mut has_active = false;

        for state in self.states.list(None)? {
            if state.is_terminal() {
                continue;
            }
            has_active = true;

            let action = match self.evaluate_pipeline(&state).await {
                Ok(action) => action,
                Err(e) => {
                    // Fatal invariant violations and unreachable externals
                    // need a human; park the pipeline.
                    tracing::error!(issue = state.issue, error = %e, "tick escalating pipeline");
                    self.states
                        .update(state.issue, |s| s.status = PipelineStatus::Blocked)?;
                    self.events.log_pipeline_event(
                        state.issue,
                        "escalated",
                        Some(&state.current_stage),
                        Some(state.current_attempt),
                        Some(&e.to_string()),
                    )?;
                    let _ = self
                        .notifier
                        .notify(
                            "factory: decision needed",
                            &format!("issue #{} escalated: {e}", state.issue),
                        )
                        .await;
                    TickAction::new(state.issue, TickActionKind::Escalate, e.to_string())
                }
            };
            actions.push(action);
            break;
        }

        if !has_active {
            if let Some(action) = self.pop_queue().await? {
                actions.push(action);
            }
        }

        if let Some(triage) = &self.triage {
            for action in triage.advance().await? {
                actions.push(action.with_prefix("triage:"));
            }
        }

        Ok(actions)
    }

    /// Decide what one pipeline needs this tick.
    async fn evaluate_pipeline(&self, state: &PipelineState) -> Result<TickAction, EngineError> {
        let issue = state.issue;

        match state.status {
            PipelineStatus::Blocked => {
                return Ok(TickAction::new(
                    issue,
                    TickActionKind::Skip,
                    "blocked; waiting for a human",
                ));
            }
            PipelineStatus::RateLimited => {
                // Re-attempt; the stage re-detects the limit if it persists
                let result = self.advance(issue).await?;
                return Ok(TickAction::new(
                    issue,
                    TickActionKind::RateLimited,
                    format!("retrying after rate limit: {}", result.action_summary()),
                ));
            }
            _ => {}
        }

        if state.current_session.is_empty() {
            return self.advance_as_action(issue).await;
        }
        let session = state.current_session.as_str();

        if self.events.detect_human_intervention(session)? {
            return Ok(TickAction::new(
                issue,
                TickActionKind::Skip,
                "human is typing in the session",
            ));
        }

        let Some(event) = self.events.get_session_state(session)? else {
            // Orphaned reference: the session was never seen by the store
            tracing::warn!(issue, session, "clearing orphaned session reference");
            self.states
                .update(issue, |s| s.current_session.clear())?;
            return self.advance_as_action(issue).await;
        };

        match event.event {
            kind if kind.is_active_equivalent() => {
                let config = self.effective_config(state)?;
                let stage = config
                    .stage(&state.current_stage)
                    .ok_or_else(|| EngineError::UnknownStage {
                        issue,
                        stage: state.current_stage.clone(),
                    })?;
                let timeout = config.stage_timeout(stage, self.opts.default_stage_timeout);

                // Timeout counts from session start; steers and sends do
                // not extend it.
                let started_at = self.events.get_session_started_at(session)?;
                let elapsed_ms = started_at
                    .map(|at| {
                        self.clock
                            .epoch_ms()
                            .saturating_sub(at.timestamp_millis().max(0) as u64)
                    })
                    .unwrap_or(0);

                if elapsed_ms < timeout.as_millis() as u64 {
                    return Ok(TickAction::new(
                        issue,
                        TickActionKind::Skip,
                        "agent busy within timeout",
                    ));
                }

                if self
                    .events
                    .has_recent_steer(session, self.opts.steer_throttle)?
                {
                    return Ok(TickAction::new(
                        issue,
                        TickActionKind::Skip,
                        "past timeout but recently steered",
                    ));
                }

                self.sessions.send_keys(session, STEER_MESSAGE).await?;
                self.events.log_session_event(
                    session,
                    issue,
                    &state.current_stage,
                    SessionEventKind::Steer,
                    None,
                    None,
                )?;
                Ok(TickAction::new(
                    issue,
                    TickActionKind::Steer,
                    "past timeout; asked the agent to wrap up",
                ))
            }

            SessionEventKind::HumanInput => Ok(TickAction::new(
                issue,
                TickActionKind::Skip,
                "session handed to a human",
            )),

            SessionEventKind::Idle | SessionEventKind::Exited => {
                let _ = self.sessions.kill_session(session).await;
                self.states.update(issue, |s| {
                    s.current_session.clear();
                    s.status = PipelineStatus::Pending;
                })?;
                self.advance_as_action(issue).await
            }

            _ => Ok(TickAction::new(
                issue,
                TickActionKind::Skip,
                "session state unknown",
            )),
        }
    }

    /// Run `advance` and translate its result into a tick action.
    async fn advance_as_action(&self, issue: u64) -> Result<TickAction, EngineError> {
        let result = self.advance(issue).await?;
        let kind = match result.action {
            AdvanceAction::Completed => TickActionKind::Completed,
            AdvanceAction::StageAdvanced => TickActionKind::Advanced,
            AdvanceAction::Retry => TickActionKind::Retry,
            AdvanceAction::Routed => TickActionKind::Routed,
            AdvanceAction::Failed => TickActionKind::Failed,
            AdvanceAction::Escalated => TickActionKind::Escalate,
            AdvanceAction::RateLimited => TickActionKind::RateLimited,
        };
        Ok(TickAction::new(issue, kind, result.message))
    }

    /// Start the next queued issue when no pipeline is active.
    async fn pop_queue(&self) -> Result<Option<TickAction>, EngineError> {
        let Some(entry) = self.events.queue_next()? else {
            return Ok(None);
        };
        let issue = entry.issue;

        let mut intent = entry.feature_intent.clone();
        if intent.is_empty() {
            let Some(model) = &self.intent else {
                return Ok(Some(TickAction::new(
                    issue,
                    TickActionKind::Skip,
                    "no feature intent and no model configured",
                )));
            };
            let issue_doc = self.hosts.get_issue(issue).await?;
            match model.derive_intent(&issue_doc).await? {
                Some(derived) => {
                    self.events.queue_set_intent(issue, &derived)?;
                    intent = derived;
                }
                None => {
                    return Ok(Some(TickAction::new(
                        issue,
                        TickActionKind::Skip,
                        "model derived no feature intent",
                    )));
                }
            }
        }

        self.events.queue_update_status(issue, QueueStatus::Active)?;
        match self.create(issue as i64, Some(intent), None).await {
            Ok(_) => Ok(Some(TickAction::new(
                issue,
                TickActionKind::QueueStarted,
                "pipeline created from queue",
            ))),
            Err(e) => {
                tracing::error!(issue, error = %e, "queued pipeline creation failed");
                self.mark_queue(issue, QueueStatus::Failed);
                Ok(Some(TickAction::new(
                    issue,
                    TickActionKind::Failed,
                    format!("create failed: {e}"),
                )))
            }
        }
    }
}

impl AdvanceResult {
    fn action_summary(&self) -> String {
        if self.message.is_empty() {
            format!("{:?}", self.action).to_lowercase()
        } else {
            self.message.clone()
        }
    }
}

#[cfg(test)]
#[path = "tick_tests.rs"]
mod tests;
