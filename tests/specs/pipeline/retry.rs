//! Retry bounds and escalation routing.

use crate::prelude::*;
use factory_config::OnFail;
use factory_core::PipelineStatus;
use factory_engine::AdvanceAction;

#[tokio::test]
async fn retry_within_limit_then_fail_at_ceiling() {
    let spec = Spec::new();
    let cfg = config(
        vec![checks_only("validate", vec!["broken"])],
        vec![("broken", check("exit 1"))],
    );
    spec.seed(2, "validate", &cfg);
    let orch = spec.orchestrator(cfg);

    // Attempt 1 fails -> retry, attempt becomes 2
    let result = orch.advance(2).await.unwrap();
    assert_eq!(result.action, AdvanceAction::Retry);
    assert_eq!(spec.states.get(2).unwrap().current_attempt, 2);

    // Attempt 2 fails -> retry, attempt becomes 3
    orch.advance(2).await.unwrap();
    assert_eq!(spec.states.get(2).unwrap().current_attempt, 3);

    // Attempt 3 is already at the ceiling -> failed
    let result = orch.advance(2).await.unwrap();
    assert_eq!(result.action, AdvanceAction::Failed);
    assert_eq!(spec.states.get(2).unwrap().status, PipelineStatus::Failed);
}

#[tokio::test]
async fn escalation_routing_blocks_then_manual_retry_resumes() {
    let spec = Spec::new();
    let mut cfg = config(
        vec![checks_only("validate", vec!["broken"])],
        vec![("broken", check("exit 1"))],
    );
    cfg.stages[0].on_fail = OnFail::Escalate;
    spec.seed(3, "validate", &cfg);
    let orch = spec.orchestrator(cfg);

    let result = orch.advance(3).await.unwrap();
    assert_eq!(result.action, AdvanceAction::Escalated);
    assert_eq!(spec.states.get(3).unwrap().status, PipelineStatus::Blocked);

    // Manual retry resumes with an incremented attempt
    let result = orch.retry(3, Some("flake understood")).await.unwrap();
    assert_eq!(result.action, AdvanceAction::Retry);
    let state = spec.states.get(3).unwrap();
    assert_eq!(state.status, PipelineStatus::InProgress);
    assert_eq!(state.current_attempt, 2);
}
