// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status overview: pipelines plus the queue.

use crate::context::Context;
use crate::output::Output;
use anyhow::Result;
use factory_storage::PipelineStore;

pub fn run(ctx: &Context, out: &Output) -> Result<()> {
    let states = PipelineStore::new(ctx.home.join("pipelines"));
    let pipelines = states.list(None)?;
    let queue = ctx.events.queue_list()?;

    if out.is_json() {
        out.json_line(&serde_json::json!({
            "pipelines": pipelines,
            "queue": queue,
        }));
        return Ok(());
    }

    if pipelines.is_empty() {
        println!("no pipelines");
    } else {
        println!("pipelines:");
        for p in &pipelines {
            let session = if p.current_session.is_empty() {
                String::new()
            } else {
                format!("  [{}]", p.current_session)
            };
            println!(
                "  #{:<6} {:<12} {:<14} attempt {}{}",
                p.issue, p.status, p.current_stage, p.current_attempt, session
            );
        }
    }

    if queue.is_empty() {
        println!("queue empty");
    } else {
        println!("queue:");
        for entry in &queue {
            println!("  {:>3}. #{:<6} {}", entry.position, entry.issue, entry.status);
        }
    }
    Ok(())
}
