// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use factory_storage::EventStore;

fn check(command: &str) -> CheckDef {
    CheckDef {
        command: command.to_string(),
        parser: "generic".to_string(),
        timeout: None,
        auto_fix: false,
        fix_command: None,
    }
}

fn spec(dir: &std::path::Path, checks: Vec<(String, CheckDef)>) -> GateSpec {
    GateSpec {
        issue: 5,
        stage: "qa".to_string(),
        attempt: 1,
        fix_round: 0,
        continue_on_fail: false,
        checks,
        cwd: dir.to_path_buf(),
        default_timeout: Duration::from_secs(30),
    }
}

fn runner() -> (GateRunner, Arc<EventStore>) {
    let events = Arc::new(EventStore::in_memory().unwrap());
    (GateRunner::new(Arc::clone(&events)), events)
}

#[tokio::test]
async fn empty_check_list_passes() {
    let dir = tempfile::tempdir().unwrap();
    let (runner, _) = runner();
    let result = runner.run(&spec(dir.path(), vec![])).await.unwrap();
    assert!(result.passed);
    assert!(result.checks.is_empty());
}

#[tokio::test]
async fn all_passing_checks_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let (runner, events) = runner();
    let result = runner
        .run(&spec(
            dir.path(),
            vec![
                ("first".to_string(), check("true")),
                ("second".to_string(), check("true")),
            ],
        ))
        .await
        .unwrap();

    assert!(result.passed);
    let names: Vec<&str> = result.checks.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);
    assert!(result.checks.iter().all(|c| c.runs == 1));

    // Every check logged exactly once
    assert_eq!(events.get_check_runs(5, "qa", 0).unwrap().len(), 2);
}

#[tokio::test]
async fn stops_on_first_failure() {
    let dir = tempfile::tempdir().unwrap();
    let (runner, _) = runner();
    let result = runner
        .run(&spec(
            dir.path(),
            vec![
                ("bad".to_string(), check("exit 3")),
                ("never".to_string(), check("true")),
            ],
        ))
        .await
        .unwrap();

    assert!(!result.passed);
    assert_eq!(result.checks.len(), 1);
    assert_eq!(result.checks[0].exit_code, 3);
    assert!(result.remaining_failures.contains_key("bad"));
}

#[tokio::test]
async fn continue_on_fail_runs_everything() {
    let dir = tempfile::tempdir().unwrap();
    let (runner, _) = runner();
    let mut s = spec(
        dir.path(),
        vec![
            ("bad".to_string(), check("exit 1")),
            ("good".to_string(), check("true")),
        ],
    );
    s.continue_on_fail = true;

    let result = runner.run(&s).await.unwrap();
    assert!(!result.passed);
    assert_eq!(result.checks.len(), 2);
    assert!(result.checks[1].passed);
    assert_eq!(result.remaining_failures.len(), 1);
}

#[tokio::test]
async fn autofix_flips_check_to_pass() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("fixed");
    let check_cmd = format!("test -f {}", marker.display());
    let fix_cmd = format!("touch {}", marker.display());

    let (runner, events) = runner();
    let def = CheckDef {
        command: check_cmd,
        parser: "generic".to_string(),
        timeout: None,
        auto_fix: true,
        fix_command: Some(fix_cmd),
    };
    let result = runner
        .run(&spec(dir.path(), vec![("fmt".to_string(), def)]))
        .await
        .unwrap();

    assert!(result.passed);
    let record = &result.checks[0];
    assert!(record.auto_fixed);
    assert_eq!(record.runs, 2);
    assert!(result.remaining_failures.is_empty());

    let logged = events.get_check_runs(5, "qa", 0).unwrap();
    assert_eq!(logged.len(), 1);
    assert!(logged[0].auto_fixed);
}

#[tokio::test]
async fn autofix_that_does_not_help_still_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (runner, _) = runner();
    let def = CheckDef {
        command: "exit 1".to_string(),
        parser: "generic".to_string(),
        timeout: None,
        auto_fix: true,
        fix_command: Some("true".to_string()),
    };
    let result = runner
        .run(&spec(dir.path(), vec![("lint".to_string(), def)]))
        .await
        .unwrap();

    assert!(!result.passed);
    let record = &result.checks[0];
    assert!(!record.auto_fixed);
    assert_eq!(record.runs, 2);
}

#[tokio::test]
async fn failure_captures_output_tail() {
    let dir = tempfile::tempdir().unwrap();
    let (runner, _) = runner();
    let result = runner
        .run(&spec(
            dir.path(),
            vec![(
                "noisy".to_string(),
                check("echo some stdout; echo some stderr >&2; exit 2"),
            )],
        ))
        .await
        .unwrap();

    let failure = &result.remaining_failures["noisy"];
    assert!(failure.findings.contains("some stdout"));
    assert!(failure.findings.contains("some stderr"));
    assert!(failure.summary.contains("exit code 2"));
}

#[tokio::test]
async fn timeout_is_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    let (runner, _) = runner();
    let def = CheckDef {
        command: "sleep 5".to_string(),
        parser: "generic".to_string(),
        timeout: Some("50ms".to_string()),
        auto_fix: false,
        fix_command: None,
    };
    let result = runner
        .run(&spec(dir.path(), vec![("slow".to_string(), def)]))
        .await
        .unwrap();

    assert!(!result.passed);
    assert!(result.checks[0].summary.contains("timed out"));
}

#[test]
fn tail_capping_marks_truncation() {
    let text = "x".repeat(10_000);
    let capped = tail_capped(&text, 1024);
    assert!(capped.starts_with("…(truncated)"));
    assert_eq!(capped.len(), "…(truncated)".len() + 1024);

    let short = tail_capped("short output", 1024);
    assert_eq!(short, "short output");
}
