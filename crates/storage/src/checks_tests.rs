// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::EventStore;
use chrono::Utc;

fn run(name: &str, fix_round: u32, passed: bool) -> CheckRun {
    CheckRun {
        issue: 5,
        stage: "qa".to_string(),
        attempt: 1,
        fix_round,
        check_name: name.to_string(),
        passed,
        auto_fixed: false,
        exit_code: if passed { 0 } else { 1 },
        duration_ms: 100,
        summary: if passed { String::new() } else { "boom".to_string() },
        findings: String::new(),
        timestamp: Utc::now(),
    }
}

#[test]
fn check_runs_filtered_by_round() {
    let store = EventStore::in_memory().unwrap();
    store.log_check_run(&run("build", 0, false)).unwrap();
    store.log_check_run(&run("lint", 0, true)).unwrap();
    store.log_check_run(&run("build", 1, true)).unwrap();

    let round0 = store.get_check_runs(5, "qa", 0).unwrap();
    assert_eq!(round0.len(), 2);
    assert_eq!(round0[0].check_name, "build");
    assert_eq!(round0[1].check_name, "lint");

    let round1 = store.get_check_runs(5, "qa", 1).unwrap();
    assert_eq!(round1.len(), 1);
    assert!(round1[0].passed);
}

#[test]
fn latest_check_run_wins() {
    let store = EventStore::in_memory().unwrap();
    store.log_check_run(&run("build", 0, false)).unwrap();
    store.log_check_run(&run("build", 1, true)).unwrap();

    let latest = store.get_latest_check_run(5, "qa", "build").unwrap().unwrap();
    assert_eq!(latest.fix_round, 1);
    assert!(latest.passed);
}

#[test]
fn latest_failed_checks_reflect_current_state() {
    let store = EventStore::in_memory().unwrap();
    // build failed then fixed; lint still failing
    store.log_check_run(&run("build", 0, false)).unwrap();
    store.log_check_run(&run("lint", 0, false)).unwrap();
    store.log_check_run(&run("build", 1, true)).unwrap();
    store.log_check_run(&run("lint", 1, false)).unwrap();

    let failed = store.get_latest_failed_checks(5, "qa").unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].check_name, "lint");
    assert_eq!(failed[0].fix_round, 1);
}

#[test]
fn check_history_is_ordered() {
    let store = EventStore::in_memory().unwrap();
    store.log_check_run(&run("build", 0, false)).unwrap();
    store.log_check_run(&run("build", 1, true)).unwrap();

    let history = store.get_check_history(5).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].fix_round, 0);
    assert_eq!(history[1].fix_round, 1);
}
