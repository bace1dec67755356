// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use crate::{EngineOptions, Orchestrator, OrchestratorDeps};
use factory_adapters::{FakeHostAdapter, FakeNotifyAdapter, FakeSessionAdapter, FakeWorktreeAdapter};
use factory_config::{CheckDef, Defaults, MergeStrategy, OnFail, PipelineConfig, StageDef, StageType};
use factory_core::{FakeClock, Issue, PipelineState, PipelineStatus};
use factory_storage::{EventStore, PipelineStore};
use std::path::PathBuf;
use std::sync::Arc;

pub type TestOrchestrator =
    Orchestrator<FakeSessionAdapter, FakeHostAdapter, FakeWorktreeAdapter, FakeNotifyAdapter, FakeClock>;

pub struct TestEnv {
    pub dir: tempfile::TempDir,
    pub events: Arc<EventStore>,
    pub states: Arc<PipelineStore>,
    pub sessions: FakeSessionAdapter,
    pub hosts: FakeHostAdapter,
    pub worktrees: FakeWorktreeAdapter,
    pub notifier: FakeNotifyAdapter,
    pub clock: FakeClock,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self {
            events: Arc::new(EventStore::in_memory().unwrap()),
            states: Arc::new(PipelineStore::new(dir.path().join("pipelines"))),
            sessions: FakeSessionAdapter::new(),
            hosts: FakeHostAdapter::new(),
            worktrees: FakeWorktreeAdapter::new(dir.path().join("worktrees")),
            notifier: FakeNotifyAdapter::new(),
            clock: FakeClock::new(),
            dir,
        }
    }

    pub fn orchestrator(&self, config: PipelineConfig) -> TestOrchestrator {
        Orchestrator::new(
            OrchestratorDeps {
                events: Arc::clone(&self.events),
                states: Arc::clone(&self.states),
                sessions: self.sessions.clone(),
                hosts: self.hosts.clone(),
                worktrees: self.worktrees.clone(),
                notifier: self.notifier.clone(),
                clock: self.clock.clone(),
            },
            config,
            self.dir.path(),
            self.dir.path().join("repo"),
            EngineOptions::fast(),
        )
    }

    /// Seed a pipeline state directly (bypassing `create`).
    pub fn seed_state(&self, issue: u64, stage: &str, config: &PipelineConfig) -> PipelineState {
        let worktree = self.dir.path().join("worktrees").join(issue.to_string());
        std::fs::create_dir_all(&worktree).unwrap();
        let state = PipelineState::new(
            issue,
            format!("Issue {issue}"),
            format!("feature/issue-{issue}"),
            worktree,
            self.dir.path().join("repo"),
            stage,
        )
        .with_goal_gates(config.goal_gate_stages().into_iter().map(String::from));
        self.states.create(&state).unwrap();
        state
    }

    pub fn set_status(&self, issue: u64, status: PipelineStatus) {
        self.states.update(issue, |s| s.status = status).unwrap();
    }

    pub fn add_issue(&self, number: u64, title: &str) {
        self.hosts.add_issue(Issue::new(number, title, "body text"));
    }
}

pub fn stage(id: &str, stage_type: StageType) -> StageDef {
    StageDef {
        id: id.to_string(),
        stage_type,
        prompt_template: None,
        checks: vec![],
        checks_after: vec![],
        goal_gate: false,
        on_fail: OnFail::SameStage,
        merge_strategy: MergeStrategy::Squash,
        timeout: None,
        model: None,
    }
}

pub fn checks_only(id: &str, checks: Vec<&str>) -> StageDef {
    StageDef {
        checks: checks.into_iter().map(String::from).collect(),
        ..stage(id, StageType::ChecksOnly)
    }
}

pub fn check(command: &str) -> CheckDef {
    CheckDef {
        command: command.to_string(),
        parser: "generic".to_string(),
        timeout: None,
        auto_fix: false,
        fix_command: None,
    }
}

pub fn config(stages: Vec<StageDef>, checks: Vec<(&str, CheckDef)>) -> PipelineConfig {
    PipelineConfig {
        repo: "acme/widgets".to_string(),
        max_fix_rounds: 2,
        fresh_session_after: None,
        defaults: Defaults::default(),
        setup: vec![],
        checks: checks
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
        stages,
    }
}

pub fn single_check_config(stage_id: &str, command: &str) -> PipelineConfig {
    config(
        vec![checks_only(stage_id, vec!["check"])],
        vec![("check", check(command))],
    )
}
