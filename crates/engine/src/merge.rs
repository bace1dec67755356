// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Merge stage routine.
//!
//! Runs outside the stage engine: rebase onto main (conflict = fail),
//! force-push with lease, find or create the PR, remove the worktree so the
//! service-side branch delete succeeds, then merge with the configured
//! strategy.

use crate::EngineError;
use factory_adapters::{HostAdapter, PrOptions, WorktreeAdapter};
use factory_config::MergeStrategy;
use factory_core::{PipelineState, StageOutcome};

/// Execute the merge flow for a pipeline. Returns the stage outcome;
/// conflicts and merge rejections are failures, not errors.
pub async fn run_merge<H: HostAdapter, W: WorktreeAdapter>(
    hosts: &H,
    worktrees: &W,
    state: &PipelineState,
    strategy: MergeStrategy,
) -> Result<StageOutcome, EngineError> {
    let issue = state.issue;
    let branch = state.branch.as_str();

    let conflicted = hosts.rebase_onto_main(&state.worktree).await?;
    if conflicted {
        tracing::warn!(issue, branch, "rebase onto main hit conflicts");
        return Ok(StageOutcome::Fail);
    }

    hosts.force_push_branch(&state.worktree, branch).await?;

    if hosts
        .find_pr_by_branch(&state.repo_dir, branch)
        .await?
        .is_none()
    {
        let title = if state.title.is_empty() {
            format!("Issue #{issue}")
        } else {
            state.title.clone()
        };
        hosts
            .create_pr(
                &state.repo_dir,
                &PrOptions {
                    branch: branch.to_string(),
                    title,
                    body: format!("Closes #{issue}\n\n{}", state.feature_intent),
                    base: String::new(),
                },
            )
            .await?;
    }

    // The worktree holds the branch checked out; remove it first so the
    // service can delete the branch after merging.
    worktrees.remove(&state.worktree).await?;

    match hosts
        .merge_pr(&state.repo_dir, branch, strategy.as_str())
        .await
    {
        Ok(()) => {
            tracing::info!(issue, branch, strategy = %strategy, "merged");
            Ok(StageOutcome::Success)
        }
        Err(e) => {
            tracing::warn!(issue, branch, error = %e, "merge failed");
            Ok(StageOutcome::Fail)
        }
    }
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
