// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue commands.

use crate::context::Context;
use crate::output::Output;
use anyhow::Result;
use clap::{Args, Subcommand};
use factory_core::QueueItem;

#[derive(Args)]
pub struct QueueArgs {
    #[command(subcommand)]
    command: QueueCommand,
}

#[derive(Subcommand)]
enum QueueCommand {
    /// Queue issues for sequential execution
    Add {
        /// Issue numbers
        issues: Vec<u64>,
        /// Feature intent applied to every added issue
        #[arg(long)]
        intent: Option<String>,
        /// Issues these depend on (must merge first)
        #[arg(long, value_delimiter = ',')]
        after: Vec<u64>,
    },
    /// List the queue
    List,
    /// Remove one issue from the queue
    Remove { issue: u64 },
    /// Empty the queue
    Clear,
    /// Set the feature intent on a queued issue
    SetIntent { issue: u64, intent: String },
}

pub fn run(ctx: &Context, args: QueueArgs, out: &Output) -> Result<()> {
    match args.command {
        QueueCommand::Add {
            issues,
            intent,
            after,
        } => {
            anyhow::ensure!(!issues.is_empty(), "pass at least one issue number");
            let items: Vec<QueueItem> = issues
                .iter()
                .map(|&issue| QueueItem {
                    issue,
                    feature_intent: intent.clone().unwrap_or_default(),
                    depends_on: after.clone(),
                })
                .collect();
            ctx.events.queue_add(&items)?;
            out.line(&format!("queued {} issue(s)", items.len()));
        }
        QueueCommand::List => {
            let entries = ctx.events.queue_list()?;
            if out.is_json() {
                out.json_line(&entries);
                return Ok(());
            }
            if entries.is_empty() {
                println!("queue is empty");
                return Ok(());
            }
            for entry in entries {
                let intent = if entry.feature_intent.is_empty() {
                    "(no intent)".to_string()
                } else {
                    entry.feature_intent.clone()
                };
                println!(
                    "{:>3}. #{:<6} {:<10} {}",
                    entry.position, entry.issue, entry.status, intent
                );
            }
        }
        QueueCommand::Remove { issue } => {
            ctx.events.queue_remove(issue)?;
            out.line(&format!("removed #{issue}"));
        }
        QueueCommand::Clear => {
            ctx.events.queue_clear()?;
            out.line("queue cleared");
        }
        QueueCommand::SetIntent { issue, intent } => {
            ctx.events.queue_set_intent(issue, &intent)?;
            out.line(&format!("intent set on #{issue}"));
        }
    }
    Ok(())
}
