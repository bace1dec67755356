//! Shared fixtures for spec tests.

use factory_adapters::{
    FakeHostAdapter, FakeNotifyAdapter, FakeSessionAdapter, FakeWorktreeAdapter,
};
use factory_config::{CheckDef, Defaults, PipelineConfig, StageDef, StageType};
use factory_core::{FakeClock, Issue, PipelineState};
use factory_engine::{EngineOptions, Orchestrator, OrchestratorDeps};
use factory_storage::{EventStore, PipelineStore};
use std::path::PathBuf;
use std::sync::Arc;

pub type SpecOrchestrator = Orchestrator<
    FakeSessionAdapter,
    FakeHostAdapter,
    FakeWorktreeAdapter,
    FakeNotifyAdapter,
    FakeClock,
>;

pub struct Spec {
    pub dir: tempfile::TempDir,
    pub events: Arc<EventStore>,
    pub states: Arc<PipelineStore>,
    pub sessions: FakeSessionAdapter,
    pub hosts: FakeHostAdapter,
    pub worktrees: FakeWorktreeAdapter,
    pub clock: FakeClock,
}

impl Spec {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self {
            events: Arc::new(EventStore::in_memory().unwrap()),
            states: Arc::new(PipelineStore::new(dir.path().join("pipelines"))),
            sessions: FakeSessionAdapter::new(),
            hosts: FakeHostAdapter::new(),
            worktrees: FakeWorktreeAdapter::new(dir.path().join("worktrees")),
            clock: FakeClock::new(),
            dir,
        }
    }

    pub fn orchestrator(&self, config: PipelineConfig) -> SpecOrchestrator {
        Orchestrator::new(
            OrchestratorDeps {
                events: Arc::clone(&self.events),
                states: Arc::clone(&self.states),
                sessions: self.sessions.clone(),
                hosts: self.hosts.clone(),
                worktrees: self.worktrees.clone(),
                notifier: FakeNotifyAdapter::new(),
                clock: self.clock.clone(),
            },
            config,
            self.dir.path(),
            self.dir.path().join("repo"),
            EngineOptions::fast(),
        )
    }

    pub fn add_issue(&self, number: u64, title: &str, body: &str) {
        self.hosts.add_issue(Issue::new(number, title, body));
    }

    /// Seed a pipeline state directly, bypassing `create`.
    pub fn seed(&self, issue: u64, stage: &str, config: &PipelineConfig) -> PipelineState {
        let worktree: PathBuf = self.dir.path().join("worktrees").join(issue.to_string());
        std::fs::create_dir_all(&worktree).unwrap();
        let state = PipelineState::new(
            issue,
            format!("Issue {issue}"),
            format!("feature/issue-{issue}"),
            worktree,
            self.dir.path().join("repo"),
            stage,
        )
        .with_goal_gates(config.goal_gate_stages());
        self.states.create(&state).unwrap();
        state
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
        on_fail: Default::default(),
        merge_strategy: Default::default(),
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
