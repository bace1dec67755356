// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GitHub adapter shelling out to `gh` and `git`.

use super::{
    validate_branch_name, validate_merge_strategy, HostAdapter, HostError, PrOptions,
};
use crate::subprocess::{run_with_timeout, HOST_COMMAND_TIMEOUT};
use async_trait::async_trait;
use factory_core::issue::parse_acceptance_criteria;
use factory_core::Issue;
use std::path::Path;
use tokio::process::Command;

/// Hosting adapter backed by the `gh` CLI and plain git.
#[derive(Clone, Default)]
pub struct GhHostAdapter;

impl GhHostAdapter {
    pub fn new() -> Self {
        Self
    }
}

async fn run(cmd: Command, description: &str) -> Result<std::process::Output, HostError> {
    run_with_timeout(cmd, HOST_COMMAND_TIMEOUT, description)
        .await
        .map_err(HostError::CommandFailed)
}

async fn run_checked(cmd: Command, description: &str) -> Result<std::process::Output, HostError> {
    let output = run(cmd, description).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(HostError::CommandFailed(format!(
            "{description}: {}",
            stderr.trim()
        )));
    }
    Ok(output)
}

#[async_trait]
impl HostAdapter for GhHostAdapter {
    async fn get_issue(&self, number: u64) -> Result<Issue, HostError> {
        let number_arg = number.to_string();
        let mut cmd = Command::new("gh");
        cmd.args([
            "issue",
            "view",
            number_arg.as_str(),
            "--json",
            "number,title,body,state,labels,milestone",
        ]);
        let output = run(cmd, "gh issue view").await?;
        if !output.status.success() {
            return Err(HostError::IssueNotFound(number));
        }

        let value: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| HostError::BadOutput(e.to_string()))?;

        let title = value["title"].as_str().unwrap_or_default().to_string();
        let body = value["body"].as_str().unwrap_or_default().to_string();
        let acceptance_criteria = parse_acceptance_criteria(&body);
        Ok(Issue {
            number,
            title,
            state: value["state"].as_str().unwrap_or_default().to_lowercase(),
            labels: value["labels"]
                .as_array()
                .map(|labels| {
                    labels
                        .iter()
                        .filter_map(|l| l["name"].as_str().map(String::from))
                        .collect()
                })
                .unwrap_or_default(),
            milestone: value["milestone"]["title"].as_str().map(String::from),
            body,
            acceptance_criteria,
        })
    }

    async fn create_pr(&self, dir: &Path, opts: &PrOptions) -> Result<(), HostError> {
        validate_branch_name(&opts.branch)?;
        let mut cmd = Command::new("gh");
        cmd.current_dir(dir).args([
            "pr",
            "create",
            "--head",
            opts.branch.as_str(),
            "--title",
            opts.title.as_str(),
            "--body",
            opts.body.as_str(),
        ]);
        if !opts.base.is_empty() {
            cmd.args(["--base", &opts.base]);
        }
        run_checked(cmd, "gh pr create").await?;
        Ok(())
    }

    async fn find_pr_by_branch(&self, dir: &Path, branch: &str) -> Result<Option<u64>, HostError> {
        validate_branch_name(branch)?;
        let mut cmd = Command::new("gh");
        cmd.current_dir(dir).args([
            "pr",
            "list",
            "--head",
            branch,
            "--json",
            "number",
            "--limit",
            "1",
        ]);
        let output = run_checked(cmd, "gh pr list").await?;
        let value: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| HostError::BadOutput(e.to_string()))?;
        Ok(value
            .as_array()
            .and_then(|prs| prs.first())
            .and_then(|pr| pr["number"].as_u64()))
    }

    async fn merge_pr(&self, dir: &Path, branch: &str, strategy: &str) -> Result<(), HostError> {
        validate_branch_name(branch)?;
        validate_merge_strategy(strategy)?;
        let strategy_flag = format!("--{strategy}");
        let mut cmd = Command::new("gh");
        cmd.current_dir(dir).args([
            "pr",
            "merge",
            branch,
            strategy_flag.as_str(),
            "--delete-branch",
        ]);
        run_checked(cmd, "gh pr merge").await?;
        Ok(())
    }

    async fn push_branch(&self, dir: &Path, branch: &str) -> Result<(), HostError> {
        validate_branch_name(branch)?;
        let mut cmd = Command::new("git");
        cmd.current_dir(dir).args(["push", "origin", branch]);
        run_checked(cmd, "git push").await?;
        Ok(())
    }

    async fn force_push_branch(&self, dir: &Path, branch: &str) -> Result<(), HostError> {
        validate_branch_name(branch)?;
        let mut cmd = Command::new("git");
        cmd.current_dir(dir)
            .args(["push", "--force-with-lease", "origin", branch]);
        run_checked(cmd, "git push --force-with-lease").await?;
        Ok(())
    }

    async fn rebase_onto_main(&self, dir: &Path) -> Result<bool, HostError> {
        let mut fetch = Command::new("git");
        fetch.current_dir(dir).args(["fetch", "origin", "main"]);
        run_checked(fetch, "git fetch").await?;

        let mut rebase = Command::new("git");
        rebase.current_dir(dir).args(["rebase", "origin/main"]);
        let output = run(rebase, "git rebase").await?;
        if output.status.success() {
            return Ok(false);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).to_lowercase();
        let stdout = String::from_utf8_lossy(&output.stdout).to_lowercase();
        let conflicted = stderr.contains("conflict") || stdout.contains("conflict");
        if conflicted {
            // Leave the worktree clean for the next attempt
            let mut abort = Command::new("git");
            abort.current_dir(dir).args(["rebase", "--abort"]);
            let _ = run(abort, "git rebase --abort").await;
            return Ok(true);
        }

        Err(HostError::CommandFailed(format!(
            "git rebase: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }

    async fn add_label(&self, number: u64, label: &str) -> Result<(), HostError> {
        let number_arg = number.to_string();
        let mut cmd = Command::new("gh");
        cmd.args(["issue", "edit", number_arg.as_str(), "--add-label", label]);
        run_checked(cmd, "gh issue edit").await?;
        Ok(())
    }
}
