// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline lifecycle commands.

use crate::context::Context;
use crate::output::Output;
use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct CreateArgs {
    /// Issue number
    pub issue: i64,
    /// One-sentence feature intent
    #[arg(long)]
    pub intent: Option<String>,
    /// Repo-specific pipeline config (multi-repo setups)
    #[arg(long, value_name = "FILE")]
    pub repo_config: Option<PathBuf>,
}

pub async fn create(ctx: &Context, config: &Path, args: CreateArgs, out: &Output) -> Result<()> {
    let orch = ctx.orchestrator(config)?;
    let state = orch
        .create(args.issue, args.intent, args.repo_config)
        .await?;
    out.line(&format!(
        "created pipeline for #{} on {} (stage {})",
        state.issue, state.branch, state.current_stage
    ));
    Ok(())
}

#[derive(Args)]
pub struct AdvanceArgs {
    pub issue: u64,
}

pub async fn advance(ctx: &Context, config: &Path, args: AdvanceArgs, out: &Output) -> Result<()> {
    let orch = ctx.orchestrator(config)?;
    let result = orch.advance(args.issue).await?;
    out.advance_result(&result);
    Ok(())
}

#[derive(Args)]
pub struct RetryArgs {
    pub issue: u64,
    /// Why the retry is warranted
    #[arg(long)]
    pub reason: Option<String>,
}

pub async fn retry(ctx: &Context, config: &Path, args: RetryArgs, out: &Output) -> Result<()> {
    let orch = ctx.orchestrator(config)?;
    let result = orch.retry(args.issue, args.reason.as_deref()).await?;
    out.advance_result(&result);
    Ok(())
}

#[derive(Args)]
pub struct FailArgs {
    pub issue: u64,
    #[arg(long)]
    pub reason: Option<String>,
}

pub async fn fail(ctx: &Context, config: &Path, args: FailArgs) -> Result<()> {
    let orch = ctx.orchestrator(config)?;
    orch.fail(args.issue, args.reason.as_deref()).await?;
    Ok(())
}

#[derive(Args)]
pub struct AbortArgs {
    pub issue: u64,
    /// Also remove the worktree
    #[arg(long)]
    pub remove_worktree: bool,
}

pub async fn abort(ctx: &Context, config: &Path, args: AbortArgs) -> Result<()> {
    let orch = ctx.orchestrator(config)?;
    orch.abort(args.issue, args.remove_worktree).await?;
    Ok(())
}

#[derive(Args)]
pub struct CleanupArgs {
    /// Issue to clean up
    pub issue: Option<u64>,
    /// Clean up every completed and failed pipeline
    #[arg(long, conflicts_with = "issue")]
    pub all: bool,
}

pub async fn cleanup(ctx: &Context, config: &Path, args: CleanupArgs) -> Result<()> {
    let orch = ctx.orchestrator(config)?;
    if args.all {
        let cleaned = orch.cleanup_all().await?;
        println!("cleaned up {} pipeline(s)", cleaned.len());
        return Ok(());
    }
    match args.issue {
        Some(issue) => {
            orch.cleanup(issue).await?;
            Ok(())
        }
        None => anyhow::bail!("pass an issue number or --all"),
    }
}

pub async fn checkin(ctx: &Context, config: &Path, out: &Output) -> Result<()> {
    let orch = ctx.orchestrator(config)?;
    let actions = orch.check_in().await?;
    out.tick_actions(&actions);
    Ok(())
}
