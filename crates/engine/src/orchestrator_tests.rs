// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::*;
use factory_core::QueueItem;

#[test]
fn branch_names_are_sanitized() {
    assert_eq!(sanitize_branch("feature/issue-42"), "feature/issue-42");
    assert_eq!(sanitize_branch("feature issue #42"), "feature-issue--42");
    assert_eq!(sanitize_branch("a:b~c"), "a-b-c");
}

#[tokio::test]
async fn create_builds_state_worktree_and_cache() {
    let env = TestEnv::new();
    env.add_issue(42, "Add widget");
    let orch = env.orchestrator(config(
        vec![
            stage("implement", StageType::Agent),
            {
                let mut s = stage("review", StageType::Agent);
                s.goal_gate = true;
                s
            },
        ],
        vec![],
    ));

    let state = orch.create(42, Some("ship the widget".into()), None).await.unwrap();

    assert_eq!(state.issue, 42);
    assert_eq!(state.title, "Add widget");
    assert_eq!(state.branch, "feature/issue-42");
    assert_eq!(state.current_stage, "implement");
    assert_eq!(state.current_attempt, 1);
    assert_eq!(state.status, PipelineStatus::Pending);
    assert_eq!(state.feature_intent, "ship the widget");
    // Goal-gate skeleton seeded empty
    assert_eq!(state.goal_gates.get("review").map(String::as_str), Some(""));

    assert_eq!(env.worktrees.created(), vec![(42, "feature/issue-42".to_string())]);
    // Issue metadata cached for offline prompt rendering
    let cached = env.states.cached_issue(42).unwrap().unwrap();
    assert_eq!(cached.title, "Add widget");

    let history = env.events.get_pipeline_history(42).unwrap();
    assert_eq!(history[0].event, "created");
}

#[tokio::test]
async fn create_rejects_bad_issue_number() {
    let env = TestEnv::new();
    let orch = env.orchestrator(single_check_config("validate", "true"));
    assert!(orch.create(0, None, None).await.is_err());
    assert!(orch.create(-3, None, None).await.is_err());
}

#[tokio::test]
async fn create_rolls_back_worktree_on_setup_failure() {
    let env = TestEnv::new();
    env.add_issue(42, "Add widget");
    let mut cfg = single_check_config("validate", "true");
    cfg.setup = vec!["exit 7".to_string()];
    let orch = env.orchestrator(cfg);

    let err = orch.create(42, None, None).await.unwrap_err();
    assert!(matches!(err, EngineError::SetupFailed(_)));
    // Worktree created then removed
    assert_eq!(env.worktrees.created().len(), 1);
    assert_eq!(env.worktrees.removed().len(), 1);
    assert!(env.states.get(42).is_err());
}

#[tokio::test]
async fn happy_path_single_checks_only_stage() {
    let env = TestEnv::new();
    let cfg = single_check_config("validate", "true");
    env.seed_state(1, "validate", &cfg);
    let orch = env.orchestrator(cfg);

    let result = orch.advance(1).await.unwrap();

    assert_eq!(result.action, AdvanceAction::Completed);
    let state = env.states.get(1).unwrap();
    assert_eq!(state.status, PipelineStatus::Completed);
    assert_eq!(state.stage_history.len(), 1);
    assert_eq!(state.stage_history[0].outcome, StageOutcome::Success);
    assert_eq!(state.stage_history[0].attempt, 1);

    // Checkpoint breadcrumb written
    assert!(env
        .states
        .checkpoint_dir(1)
        .join("validate.1.md")
        .exists());
}

#[tokio::test]
async fn advance_on_completed_pipeline_is_a_noop() {
    let env = TestEnv::new();
    let cfg = single_check_config("validate", "true");
    env.seed_state(1, "validate", &cfg);
    env.set_status(1, PipelineStatus::Completed);
    let orch = env.orchestrator(cfg);

    let before = env.states.get(1).unwrap();
    let result = orch.advance(1).await.unwrap();
    assert_eq!(result.action, AdvanceAction::Completed);
    assert_eq!(env.states.get(1).unwrap(), before);
}

#[tokio::test]
async fn failing_stage_retries_then_fails_at_attempt_ceiling() {
    let env = TestEnv::new();
    let cfg = single_check_config("validate", "exit 1");
    env.seed_state(2, "validate", &cfg);
    let orch = env.orchestrator(cfg);

    // Attempt 1 -> retry with attempt 2
    let result = orch.advance(2).await.unwrap();
    assert_eq!(result.action, AdvanceAction::Retry);
    let state = env.states.get(2).unwrap();
    assert_eq!(state.current_attempt, 2);
    assert_eq!(state.status, PipelineStatus::Pending);

    // Attempt 2 -> retry with attempt 3
    assert_eq!(orch.advance(2).await.unwrap().action, AdvanceAction::Retry);

    // Attempt 3 is the ceiling -> failed
    let result = orch.advance(2).await.unwrap();
    assert_eq!(result.action, AdvanceAction::Failed);
    assert_eq!(env.states.get(2).unwrap().status, PipelineStatus::Failed);
    assert_eq!(env.states.get(2).unwrap().stage_history.len(), 3);
}

#[tokio::test]
async fn on_fail_escalate_blocks_and_notifies() {
    let env = TestEnv::new();
    let mut cfg = single_check_config("validate", "exit 1");
    cfg.stages[0].on_fail = OnFail::Escalate;
    env.seed_state(3, "validate", &cfg);
    let orch = env.orchestrator(cfg);

    let result = orch.advance(3).await.unwrap();
    assert_eq!(result.action, AdvanceAction::Escalated);
    assert_eq!(env.states.get(3).unwrap().status, PipelineStatus::Blocked);

    let events = env.events.get_pipeline_history(3).unwrap();
    assert!(events.iter().any(|e| e.event == "escalated"));
    assert!(!env.notifier.sent().is_empty());
}

#[tokio::test]
async fn on_fail_routes_to_named_stage_with_attempt_reset() {
    let env = TestEnv::new();
    let mut cfg = config(
        vec![
            checks_only("implement", vec![]),
            checks_only("review", vec!["check"]),
        ],
        vec![("check", check("exit 1"))],
    );
    cfg.stages[1].on_fail = OnFail::Named("implement".to_string());
    env.seed_state(4, "review", &cfg);
    env.states.update(4, |s| s.current_attempt = 2).unwrap();
    let orch = env.orchestrator(cfg);

    let result = orch.advance(4).await.unwrap();
    assert_eq!(result.action, AdvanceAction::Routed);
    let state = env.states.get(4).unwrap();
    assert_eq!(state.current_stage, "implement");
    assert_eq!(state.current_attempt, 1);
    assert_eq!(state.status, PipelineStatus::Pending);
    assert!(state.current_session.is_empty());
}

#[tokio::test]
async fn unknown_stage_is_a_hard_error() {
    let env = TestEnv::new();
    let cfg = single_check_config("validate", "true");
    env.seed_state(5, "ghost-stage", &cfg);
    let orch = env.orchestrator(cfg);

    let err = orch.advance(5).await.unwrap_err();
    assert!(matches!(err, EngineError::UnknownStage { .. }));
}

#[tokio::test]
async fn goal_gate_blocks_completion() {
    let env = TestEnv::new();
    // review is a goal gate but qa is the only stage that will run
    let mut cfg = config(
        vec![
            checks_only("review", vec![]),
            checks_only("qa", vec!["check"]),
        ],
        vec![("check", check("true"))],
    );
    cfg.stages[0].goal_gate = true;
    env.seed_state(6, "qa", &cfg);
    let orch = env.orchestrator(cfg);

    let result = orch.advance(6).await.unwrap();
    assert_eq!(result.action, AdvanceAction::Failed);
    assert!(result.message.contains("goal gate `review` not satisfied"));
    assert_eq!(env.states.get(6).unwrap().status, PipelineStatus::Failed);
}

#[tokio::test]
async fn goal_gate_success_allows_completion() {
    let env = TestEnv::new();
    let mut cfg = config(
        vec![checks_only("review", vec!["check"])],
        vec![("check", check("true"))],
    );
    cfg.stages[0].goal_gate = true;
    env.seed_state(7, "review", &cfg);
    let orch = env.orchestrator(cfg);

    let result = orch.advance(7).await.unwrap();
    assert_eq!(result.action, AdvanceAction::Completed);
    let state = env.states.get(7).unwrap();
    assert_eq!(state.goal_gates["review"], "success");
    assert_eq!(state.status, PipelineStatus::Completed);
}

#[tokio::test]
async fn stage_advanced_resets_counters() {
    let env = TestEnv::new();
    let cfg = config(
        vec![
            checks_only("validate", vec!["check"]),
            checks_only("qa", vec!["check"]),
        ],
        vec![("check", check("true"))],
    );
    env.seed_state(8, "validate", &cfg);
    env.states
        .update(8, |s| {
            s.current_attempt = 2;
            s.current_session = "8-validate".to_string();
        })
        .unwrap();
    let orch = env.orchestrator(cfg);

    let result = orch.advance(8).await.unwrap();
    assert_eq!(result.action, AdvanceAction::StageAdvanced);
    assert_eq!(result.stage, "qa");
    let state = env.states.get(8).unwrap();
    assert_eq!(state.current_stage, "qa");
    assert_eq!(state.current_attempt, 1);
    assert!(state.current_session.is_empty());
    assert_eq!(state.status, PipelineStatus::Pending);
}

#[tokio::test]
async fn merge_stage_runs_merge_flow_and_completes() {
    let env = TestEnv::new();
    let cfg = config(vec![stage("merge", StageType::Merge)], vec![]);
    let state = env.seed_state(9, "merge", &cfg);
    // The merge needs a PR-able branch; fake host tracks everything
    let orch = env.orchestrator(cfg);

    let result = orch.advance(9).await.unwrap();
    assert_eq!(result.action, AdvanceAction::Completed);
    assert_eq!(env.hosts.merged().len(), 1);
    assert_eq!(env.hosts.merged()[0].0, "feature/issue-9");
    // Worktree removed by the merge flow
    assert!(env.worktrees.removed().contains(&state.worktree));
}

#[tokio::test]
async fn merge_conflict_applies_on_fail_routing() {
    let env = TestEnv::new();
    let mut cfg = config(
        vec![
            checks_only("implement", vec![]),
            stage("merge", StageType::Merge),
        ],
        vec![],
    );
    cfg.stages[1].on_fail = OnFail::Named("implement".to_string());
    env.hosts.set_rebase_conflicts(true);
    env.seed_state(10, "merge", &cfg);
    let orch = env.orchestrator(cfg);

    let result = orch.advance(10).await.unwrap();
    assert_eq!(result.action, AdvanceAction::Routed);
    assert_eq!(env.states.get(10).unwrap().current_stage, "implement");
}

#[tokio::test]
async fn merge_success_skips_fallback_stage_in_linear_order() {
    let env = TestEnv::new();
    // merge's on_fail target sits right after it in the stage list; after a
    // successful merge it must be skipped
    let mut cfg = config(
        vec![
            stage("merge", StageType::Merge),
            checks_only("resolve-conflicts", vec![]),
            checks_only("announce", vec!["check"]),
        ],
        vec![("check", check("true"))],
    );
    cfg.stages[0].on_fail = OnFail::Named("resolve-conflicts".to_string());
    env.seed_state(11, "merge", &cfg);
    let orch = env.orchestrator(cfg);

    let result = orch.advance(11).await.unwrap();
    assert_eq!(result.action, AdvanceAction::StageAdvanced);
    assert_eq!(result.stage, "announce");
}

#[tokio::test]
async fn contract_check_skipped_without_dependents() {
    let env = TestEnv::new();
    let cfg = config(
        vec![
            checks_only("validate", vec!["check"]),
            checks_only("contract-check", vec![]),
        ],
        vec![("check", check("true"))],
    );
    env.seed_state(12, "validate", &cfg);
    let orch = env.orchestrator(cfg);

    // No dependent issues -> contract-check is vacuous -> pipeline completes
    let result = orch.advance(12).await.unwrap();
    assert_eq!(result.action, AdvanceAction::Completed);
    let events = env.events.get_pipeline_history(12).unwrap();
    assert!(events.iter().any(|e| e.event == "stage_skipped"));
}

#[tokio::test]
async fn contract_check_runs_with_dependents() {
    let env = TestEnv::new();
    let cfg = config(
        vec![
            checks_only("validate", vec!["check"]),
            checks_only("contract-check", vec![]),
        ],
        vec![("check", check("true"))],
    );
    env.seed_state(13, "validate", &cfg);
    env.states
        .update(13, |s| {
            s.runtime_vars
                .insert("dependent_issues".to_string(), "14, 15".to_string());
        })
        .unwrap();
    let orch = env.orchestrator(cfg);

    let result = orch.advance(13).await.unwrap();
    assert_eq!(result.action, AdvanceAction::StageAdvanced);
    assert_eq!(result.stage, "contract-check");
}

#[tokio::test]
async fn merge_success_records_queue_dependents() {
    let env = TestEnv::new();
    let cfg = config(vec![stage("merge", StageType::Merge)], vec![]);
    env.seed_state(20, "merge", &cfg);
    env.events
        .queue_add(&[
            QueueItem {
                issue: 21,
                feature_intent: String::new(),
                depends_on: vec![20],
            },
        ])
        .unwrap();
    let orch = env.orchestrator(cfg);

    orch.advance(20).await.unwrap();
    let state = env.states.get(20).unwrap();
    assert_eq!(
        state.runtime_vars.get("dependent_issues").map(String::as_str),
        Some("21")
    );
}

#[tokio::test]
async fn retry_overrides_ceiling_and_is_rejected_when_completed() {
    let env = TestEnv::new();
    let cfg = single_check_config("validate", "true");
    env.seed_state(14, "validate", &cfg);
    env.states.update(14, |s| s.current_attempt = 3).unwrap();
    env.set_status(14, PipelineStatus::Blocked);
    let orch = env.orchestrator(cfg);

    let result = orch.retry(14, Some("fixed the flake")).await.unwrap();
    assert_eq!(result.action, AdvanceAction::Retry);
    let state = env.states.get(14).unwrap();
    assert_eq!(state.current_attempt, 4);
    assert_eq!(state.status, PipelineStatus::InProgress);

    let events = env.events.get_pipeline_history(14).unwrap();
    assert!(events
        .iter()
        .any(|e| e.event == "retry" && e.detail.as_deref() == Some("manual: fixed the flake")));

    env.set_status(14, PipelineStatus::Completed);
    assert!(matches!(
        orch.retry(14, None).await,
        Err(EngineError::AlreadyCompleted(14))
    ));
}

#[tokio::test]
async fn fail_kills_session_and_marks_failed() {
    let env = TestEnv::new();
    let cfg = single_check_config("validate", "true");
    env.seed_state(15, "validate", &cfg);
    env.sessions.add_session("15-validate");
    env.states
        .update(15, |s| s.current_session = "15-validate".to_string())
        .unwrap();
    let orch = env.orchestrator(cfg);

    orch.fail(15, Some("operator gave up")).await.unwrap();
    let state = env.states.get(15).unwrap();
    assert_eq!(state.status, PipelineStatus::Failed);
    assert!(state.current_session.is_empty());
    assert!(!env.sessions.is_alive("15-validate"));
}

#[tokio::test]
async fn cleanup_only_for_terminal_pipelines() {
    let env = TestEnv::new();
    let cfg = single_check_config("validate", "true");
    let state = env.seed_state(16, "validate", &cfg);
    let orch = env.orchestrator(cfg);

    // In-flight pipelines may not be cleaned up
    let err = orch.cleanup(16).await.unwrap_err();
    assert!(matches!(err, EngineError::NotTerminal { .. }));

    env.set_status(16, PipelineStatus::Failed);
    orch.cleanup(16).await.unwrap();
    assert!(env.states.get(16).is_err());
    assert!(env.worktrees.removed().contains(&state.worktree));

    // Cleanup of a missing pipeline is an error, not a panic
    assert!(orch.cleanup(16).await.is_err());
}

#[tokio::test]
async fn cleanup_all_sweeps_terminal_pipelines() {
    let env = TestEnv::new();
    let cfg = single_check_config("validate", "true");
    env.seed_state(17, "validate", &cfg);
    env.seed_state(18, "validate", &cfg);
    env.seed_state(19, "validate", &cfg);
    env.set_status(17, PipelineStatus::Completed);
    env.set_status(18, PipelineStatus::Failed);
    let orch = env.orchestrator(cfg);

    let cleaned = orch.cleanup_all().await.unwrap();
    assert_eq!(cleaned, vec![17, 18]);
    assert!(env.states.get(19).is_ok());
}

#[tokio::test]
async fn engine_error_reverts_status_to_pending() {
    let env = TestEnv::new();
    // Agent stage whose session spawn will fail
    let cfg = config(vec![stage("implement", StageType::Agent)], vec![]);
    env.seed_state(22, "implement", &cfg);
    env.sessions.fail_next_spawn();
    let orch = env.orchestrator(cfg);

    assert!(orch.advance(22).await.is_err());
    assert_eq!(env.states.get(22).unwrap().status, PipelineStatus::Pending);
}
