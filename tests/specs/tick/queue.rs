//! Queue auto-derivation of feature intent.

use crate::prelude::*;
use factory_core::{QueueItem, QueueStatus, TickActionKind};
use factory_engine::FakeIntentModel;
use std::sync::Arc;

fn queue_issue(spec: &Spec, issue: u64) {
    spec.events
        .queue_add(&[QueueItem {
            issue,
            feature_intent: String::new(),
            depends_on: vec![],
        }])
        .unwrap();
}

#[tokio::test]
async fn intent_is_derived_persisted_and_pipeline_started() {
    let spec = Spec::new();
    spec.add_issue(42, "Add export button", "Users want CSV export.");
    queue_issue(&spec, 42);

    let cfg = config(
        vec![checks_only("validate", vec!["ok"])],
        vec![("ok", check("true"))],
    );
    let orch = spec
        .orchestrator(cfg)
        .with_intent_model(Arc::new(FakeIntentModel::with_intent(
            "Adds a CSV export button.",
        )));

    let actions = orch.check_in().await.unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].action, TickActionKind::QueueStarted);

    let row = &spec.events.queue_list().unwrap()[0];
    assert_eq!(row.status, QueueStatus::Active);
    assert_eq!(row.feature_intent, "Adds a CSV export button.");

    let state = spec.states.get(42).unwrap();
    assert_eq!(state.feature_intent, "Adds a CSV export button.");
}

#[tokio::test]
async fn no_intent_answer_leaves_row_pending() {
    let spec = Spec::new();
    spec.add_issue(42, "Vague", "???");
    queue_issue(&spec, 42);

    let cfg = config(
        vec![checks_only("validate", vec!["ok"])],
        vec![("ok", check("true"))],
    );
    let orch = spec
        .orchestrator(cfg)
        .with_intent_model(Arc::new(FakeIntentModel::declining()));

    let actions = orch.check_in().await.unwrap();
    assert_eq!(actions[0].action, TickActionKind::Skip);
    assert_eq!(
        spec.events.queue_list().unwrap()[0].status,
        QueueStatus::Pending
    );
    // No pipeline was created
    assert!(spec.states.get(42).is_err());
}
