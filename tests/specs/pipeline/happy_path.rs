//! Happy-path: a single always-passing checks_only stage completes the
//! pipeline in one advance.

use crate::prelude::*;
use factory_core::{PipelineStatus, StageOutcome};
use factory_engine::AdvanceAction;

#[tokio::test]
async fn single_validate_stage_completes() {
    let spec = Spec::new();
    let cfg = config(
        vec![checks_only("validate", vec!["always-passes"])],
        vec![("always-passes", check("true"))],
    );
    spec.seed(1, "validate", &cfg);
    let orch = spec.orchestrator(cfg);

    let result = orch.advance(1).await.unwrap();

    assert_eq!(result.action, AdvanceAction::Completed);
    let state = spec.states.get(1).unwrap();
    assert_eq!(state.status, PipelineStatus::Completed);
    assert_eq!(state.stage_history.len(), 1);
    assert_eq!(state.stage_history[0].stage, "validate");
    assert_eq!(state.stage_history[0].outcome, StageOutcome::Success);
}

#[tokio::test]
async fn advance_is_idempotent_after_completion() {
    let spec = Spec::new();
    let cfg = config(
        vec![checks_only("validate", vec!["always-passes"])],
        vec![("always-passes", check("true"))],
    );
    spec.seed(1, "validate", &cfg);
    let orch = spec.orchestrator(cfg);

    orch.advance(1).await.unwrap();
    let before = spec.states.get(1).unwrap();

    let again = orch.advance(1).await.unwrap();
    assert_eq!(again.action, AdvanceAction::Completed);
    assert_eq!(spec.states.get(1).unwrap(), before);
}
