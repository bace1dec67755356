//! Human take-over detection during the tick.

use crate::prelude::*;
use chrono::{TimeZone, Utc};
use factory_config::StageType;
use factory_core::{PipelineStatus, SessionEventKind, TickActionKind};

#[tokio::test]
async fn active_without_factory_send_is_a_human() {
    let spec = Spec::new();
    let cfg = config(vec![stage("implement", StageType::Agent)], vec![]);
    spec.seed(6, "implement", &cfg);
    spec.states
        .update(6, |s| {
            s.current_session = "6-implement".to_string();
            s.status = PipelineStatus::InProgress;
        })
        .unwrap();
    spec.sessions.add_session("6-implement");

    // started at T+0, active at T+10 with no factory_send in between
    let t0 = Utc.timestamp_millis_opt(0).single().unwrap();
    let t10 = Utc.timestamp_millis_opt(10_000).single().unwrap();
    spec.events
        .log_session_event_at("6-implement", 6, "implement", SessionEventKind::Started, None, None, t0)
        .unwrap();
    spec.events
        .log_session_event_at("6-implement", 6, "implement", SessionEventKind::Active, None, None, t10)
        .unwrap();

    assert!(spec.events.detect_human_intervention("6-implement").unwrap());

    let orch = spec.orchestrator(cfg);
    let actions = orch.check_in().await.unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].action, TickActionKind::Skip);
    assert!(actions[0].detail.contains("human"));

    // The session was left untouched
    assert!(spec.sessions.is_alive("6-implement"));
}
