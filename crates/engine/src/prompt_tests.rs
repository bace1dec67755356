// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn renders_template_file_with_vars() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("prompts")).unwrap();
    std::fs::write(
        dir.path().join("prompts/implement.md"),
        "Implement #${issue_number} in ${repo_root}.",
    )
    .unwrap();

    let rendered = render_prompt(
        dir.path(),
        Some("prompts/implement.md"),
        &vars(&[("issue_number", "42"), ("repo_root", "/w/42")]),
    )
    .unwrap();
    assert_eq!(rendered, "Implement #42 in /w/42.");
}

#[test]
fn falls_back_to_default_template() {
    let dir = tempfile::tempdir().unwrap();
    let rendered = render_prompt(
        dir.path(),
        None,
        &vars(&[
            ("issue_number", "7"),
            ("issue_title", "Fix crash"),
            ("issue_body", "Steps to reproduce"),
        ]),
    )
    .unwrap();
    assert!(rendered.contains("issue #7: Fix crash"));
    assert!(rendered.contains("Steps to reproduce"));
}

#[test]
fn missing_template_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(render_prompt(dir.path(), Some("nope.md"), &vars(&[])).is_err());
}

#[test]
fn fix_prompt_enumerates_failures_only() {
    let passing = CheckRecord {
        name: "build".to_string(),
        passed: true,
        auto_fixed: false,
        runs: 1,
        exit_code: 0,
        duration_ms: 10,
        summary: String::new(),
        findings: String::new(),
    };
    let failing = CheckRecord {
        name: "lint".to_string(),
        passed: false,
        auto_fixed: false,
        runs: 1,
        exit_code: 2,
        duration_ms: 10,
        summary: "lint failed with exit code 2".to_string(),
        findings: "warning: unused variable `x`".to_string(),
    };

    let prompt = build_fix_prompt(&[passing, failing]);
    assert!(prompt.contains("## lint (exit code 2)"));
    assert!(prompt.contains("unused variable"));
    assert!(!prompt.contains("## build"));
}
