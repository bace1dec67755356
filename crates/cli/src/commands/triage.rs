// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Triage commands.

use crate::context::Context;
use crate::output::Output;
use anyhow::Result;
use clap::{Args, Subcommand};
use factory_adapters::{GhHostAdapter, HostAdapter};
use std::path::Path;

#[derive(Args)]
pub struct TriageArgs {
    #[command(subcommand)]
    command: TriageCommand,
}

#[derive(Subcommand)]
enum TriageCommand {
    /// Enqueue an issue for triage (fetches title/body from the host)
    Enqueue { issue: u64 },
    /// Advance the triage state machine one bounded step
    Advance,
}

pub async fn run(ctx: &Context, config: &Path, args: TriageArgs, out: &Output) -> Result<()> {
    let Some(runner) = ctx.triage_runner(config)? else {
        anyhow::bail!("no triage.yml found next to {}", config.display());
    };

    match args.command {
        TriageCommand::Enqueue { issue } => {
            let doc = GhHostAdapter::new().get_issue(issue).await?;
            let actions = runner.enqueue(issue, doc.title, doc.body).await?;
            out.tick_actions(&actions);
        }
        TriageCommand::Advance => {
            let actions = runner.advance_inner().await?;
            out.tick_actions(&actions);
        }
    }
    Ok(())
}
