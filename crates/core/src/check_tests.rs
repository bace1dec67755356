// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn empty_gate_passes() {
    let result = GateResult::empty("validate", 3, 0);
    assert!(result.passed);
    assert!(result.checks.is_empty());
    assert!(result.remaining_failures.is_empty());
}

#[test]
fn gate_result_serializes_with_failures() {
    let mut failures = std::collections::BTreeMap::new();
    failures.insert(
        "lint".to_string(),
        RemainingFailure {
            summary: "2 warnings".to_string(),
            findings: "unused import".to_string(),
        },
    );
    let result = GateResult {
        gate: "qa".to_string(),
        issue: 9,
        fix_round: 1,
        passed: false,
        checks: vec![CheckRecord {
            name: "lint".to_string(),
            passed: false,
            auto_fixed: false,
            runs: 1,
            exit_code: 1,
            duration_ms: 40,
            summary: "2 warnings".to_string(),
            findings: "unused import".to_string(),
        }],
        remaining_failures: failures,
    };

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["passed"], false);
    assert_eq!(json["checks"][0]["name"], "lint");
    assert_eq!(json["remaining_failures"]["lint"]["summary"], "2 warnings");
}

#[test]
fn check_state_display() {
    assert_eq!(CheckState::Pass.to_string(), "pass");
    assert_eq!(CheckState::Fail.to_string(), "fail");
    assert_eq!(CheckState::Skipped.to_string(), "skipped");
}
