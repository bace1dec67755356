// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! factory - issue pipeline orchestrator CLI

mod commands;
mod context;
mod env;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{event, pipeline, queue, status, triage};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "factory",
    version,
    about = "Drives issues through agent-powered dev pipelines"
)]
struct Cli {
    /// Pipeline config file
    #[arg(long, global = true, default_value = "factory.yml", value_name = "FILE")]
    config: PathBuf,

    /// Emit machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a pipeline for an issue
    Create(pipeline::CreateArgs),
    /// Run one step of a pipeline
    Advance(pipeline::AdvanceArgs),
    /// Re-attempt the current stage (bypasses the attempt ceiling)
    Retry(pipeline::RetryArgs),
    /// Mark a pipeline failed
    Fail(pipeline::FailArgs),
    /// Fail a pipeline and optionally drop its worktree
    Abort(pipeline::AbortArgs),
    /// Remove terminal pipelines (state + worktree)
    Cleanup(pipeline::CleanupArgs),
    /// One scheduler tick: evaluate pipelines, pop the queue, advance triage
    Checkin,
    /// Show pipelines and queue state
    Status,
    /// Queue management
    Queue(queue::QueueArgs),
    /// Triage management
    Triage(triage::TriageArgs),
    /// Event log access (invoked by agent hooks)
    Event(event::EventArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = context::Context::open()?;
    let out = output::Output::new(cli.json);

    match cli.command {
        Commands::Create(args) => pipeline::create(&ctx, &cli.config, args, &out).await,
        Commands::Advance(args) => pipeline::advance(&ctx, &cli.config, args, &out).await,
        Commands::Retry(args) => pipeline::retry(&ctx, &cli.config, args, &out).await,
        Commands::Fail(args) => pipeline::fail(&ctx, &cli.config, args).await,
        Commands::Abort(args) => pipeline::abort(&ctx, &cli.config, args).await,
        Commands::Cleanup(args) => pipeline::cleanup(&ctx, &cli.config, args).await,
        Commands::Checkin => pipeline::checkin(&ctx, &cli.config, &out).await,
        Commands::Status => status::run(&ctx, &out),
        Commands::Queue(args) => queue::run(&ctx, args, &out),
        Commands::Triage(args) => triage::run(&ctx, &cli.config, args, &out).await,
        Commands::Event(args) => event::run(&ctx, args),
    }
}
