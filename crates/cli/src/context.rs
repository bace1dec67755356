// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wiring: builds the orchestrator with production adapters.

use crate::env;
use anyhow::{Context as _, Result};
use factory_adapters::{
    ClaudePrintRunner, DesktopNotifyAdapter, GhHostAdapter, GitWorktreeAdapter, TmuxAdapter,
};
use factory_config::{PipelineConfig, TriageConfig};
use factory_core::SystemClock;
use factory_engine::{
    EngineOptions, Orchestrator, OrchestratorDeps, PrintIntentModel, TriageRunner,
};
use factory_storage::{EventStore, PipelineStore, TriageStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type CliOrchestrator =
    Orchestrator<TmuxAdapter, GhHostAdapter, GitWorktreeAdapter, DesktopNotifyAdapter, SystemClock>;

pub struct Context {
    pub home: PathBuf,
    pub events: Arc<EventStore>,
}

impl Context {
    /// Open the event store; enough for `event log` and queue commands.
    pub fn open() -> Result<Self> {
        let home = env::factory_home()?;
        let events = Arc::new(
            EventStore::open(&home.join("factory.db")).context("opening event store")?,
        );
        Ok(Self { home, events })
    }

    /// Build the full orchestrator from a pipeline config file.
    pub fn orchestrator(&self, config_path: &Path) -> Result<CliOrchestrator> {
        let config = PipelineConfig::load(config_path)
            .with_context(|| format!("loading {}", config_path.display()))?;
        let config_dir = config_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();
        let repo_dir = std::env::current_dir()?;

        let mut opts = EngineOptions::default();
        if let Some(agent) = env::agent_command() {
            opts.agent_command = agent;
        }

        let states = Arc::new(PipelineStore::new(self.home.join("pipelines")));
        let deps = OrchestratorDeps {
            events: Arc::clone(&self.events),
            states,
            sessions: TmuxAdapter::new(),
            hosts: GhHostAdapter::new(),
            worktrees: GitWorktreeAdapter::new(&repo_dir, self.home.join("worktrees")),
            notifier: DesktopNotifyAdapter::new(),
            clock: SystemClock,
        };

        let intent = PrintIntentModel::new(
            ClaudePrintRunner::new(opts.agent_command.clone()),
            &repo_dir,
        );
        let mut orchestrator = Orchestrator::new(deps, config, config_dir, repo_dir, opts)
            .with_intent_model(Arc::new(intent));

        if let Some(triage) = self.triage_runner(config_path)? {
            orchestrator = orchestrator.with_triage(Arc::new(triage));
        }
        Ok(orchestrator)
    }

    /// Build the triage runner when a triage config sits next to the
    /// pipeline config (`triage.yml`).
    pub fn triage_runner(
        &self,
        config_path: &Path,
    ) -> Result<Option<TriageRunner<TmuxAdapter, ClaudePrintRunner, GhHostAdapter>>> {
        let config_dir = config_path.parent().unwrap_or(Path::new("."));
        let triage_path = config_dir.join("triage.yml");
        if !triage_path.exists() {
            return Ok(None);
        }
        let config = TriageConfig::load(&triage_path)
            .with_context(|| format!("loading {}", triage_path.display()))?;

        let mut opts = EngineOptions::default();
        if let Some(agent) = env::agent_command() {
            opts.agent_command = agent;
        }

        let namespace = config.repo.replace('/', "-");
        let store = Arc::new(TriageStore::new(self.home.join("triage").join(namespace)));
        let workdir = std::env::current_dir()?;
        Ok(Some(TriageRunner::new(
            store,
            Arc::clone(&self.events),
            TmuxAdapter::new(),
            ClaudePrintRunner::new(opts.agent_command.clone()),
            GhHostAdapter::new(),
            config,
            config_dir,
            workdir,
            opts,
        )))
    }
}
