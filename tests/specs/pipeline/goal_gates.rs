//! Goal-gate enforcement at completion time.

use crate::prelude::*;
use factory_core::PipelineStatus;
use factory_engine::AdvanceAction;

#[tokio::test]
async fn completion_rejected_while_goal_gate_unsatisfied() {
    let spec = Spec::new();
    // review is the goal gate; the pipeline starts at qa and runs off the
    // end of the stage list without review ever succeeding
    let mut cfg = config(
        vec![
            checks_only("implement", vec![]),
            checks_only("review", vec![]),
            checks_only("qa", vec!["ok"]),
        ],
        vec![("ok", check("true"))],
    );
    cfg.stages[1].goal_gate = true;
    spec.seed(4, "qa", &cfg);
    let orch = spec.orchestrator(cfg);

    let result = orch.advance(4).await.unwrap();
    assert_eq!(result.action, AdvanceAction::Failed);
    assert!(result.message.contains("goal gate `review` not satisfied"));
    assert_eq!(spec.states.get(4).unwrap().status, PipelineStatus::Failed);
}

#[tokio::test]
async fn completion_allowed_once_gates_pass() {
    let spec = Spec::new();
    let mut cfg = config(
        vec![
            checks_only("review", vec!["ok"]),
            checks_only("qa", vec!["ok"]),
        ],
        vec![("ok", check("true"))],
    );
    cfg.stages[0].goal_gate = true;
    spec.seed(5, "review", &cfg);
    let orch = spec.orchestrator(cfg);

    // review succeeds -> gate satisfied, advance to qa
    let result = orch.advance(5).await.unwrap();
    assert_eq!(result.action, AdvanceAction::StageAdvanced);
    assert_eq!(spec.states.get(5).unwrap().goal_gates["review"], "success");

    // qa succeeds -> completion passes the gate check
    let result = orch.advance(5).await.unwrap();
    assert_eq!(result.action, AdvanceAction::Completed);
    assert_eq!(spec.states.get(5).unwrap().status, PipelineStatus::Completed);
}
