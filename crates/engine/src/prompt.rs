// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt construction.

use crate::EngineError;
use factory_config::template::interpolate;
use factory_core::CheckRecord;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

/// Prompt used when a stage configures no template.
const DEFAULT_TEMPLATE: &str = "\
Work on issue #${issue_number}: ${issue_title}

${issue_body}
";

/// Render a stage prompt from its template file (relative to the config
/// file's directory), falling back to the default template.
pub fn render_prompt(
    config_dir: &Path,
    template: Option<&str>,
    vars: &HashMap<String, String>,
) -> Result<String, EngineError> {
    let text = match template {
        Some(rel) => std::fs::read_to_string(config_dir.join(rel))?,
        None => DEFAULT_TEMPLATE.to_string(),
    };
    Ok(interpolate(&text, vars))
}

/// Build the fix prompt for a failed gate, enumerating each failing check's
/// name, exit code, summary, and findings.
pub fn build_fix_prompt(records: &[CheckRecord]) -> String {
    let mut prompt = String::from(
        "The following checks failed. Fix the underlying problems, then stop.\n",
    );
    for record in records.iter().filter(|r| !r.passed) {
        let _ = write!(
            prompt,
            "\n## {} (exit code {})\n{}\n",
            record.name, record.exit_code, record.summary
        );
        if !record.findings.is_empty() {
            let _ = write!(prompt, "```\n{}\n```\n", record.findings);
        }
    }
    prompt
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
