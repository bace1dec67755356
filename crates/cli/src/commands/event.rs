// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event log access.
//!
//! `factory event log` is the callback the agent hooks invoke to report
//! session lifecycle transitions.

use crate::context::Context;
use anyhow::Result;
use clap::{Args, Subcommand};
use factory_core::SessionEventKind;

#[derive(Args)]
pub struct EventArgs {
    #[command(subcommand)]
    command: EventCommand,
}

#[derive(Subcommand)]
enum EventCommand {
    /// Append a session lifecycle event
    Log {
        #[arg(long)]
        session: String,
        #[arg(long)]
        issue: u64,
        #[arg(long)]
        stage: String,
        /// One of: started, active, idle, exited, factory_send, steer, human_input
        #[arg(long)]
        event: String,
        #[arg(long)]
        exit_code: Option<i32>,
    },
    /// Show a pipeline's audit history
    History { issue: u64 },
}

pub fn run(ctx: &Context, args: EventArgs) -> Result<()> {
    match args.command {
        EventCommand::Log {
            session,
            issue,
            stage,
            event,
            exit_code,
        } => {
            let kind = SessionEventKind::parse(&event)
                .ok_or_else(|| anyhow::anyhow!("unknown event kind: {event}"))?;
            ctx.events
                .log_session_event(&session, issue, &stage, kind, exit_code, None)?;
            Ok(())
        }
        EventCommand::History { issue } => {
            for event in ctx.events.get_pipeline_history(issue)? {
                let stage = event.stage.as_deref().unwrap_or("-");
                let detail = event.detail.as_deref().unwrap_or("");
                println!(
                    "{} {:<16} {:<12} {}",
                    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    event.event,
                    stage,
                    detail
                );
            }
            Ok(())
        }
    }
}
