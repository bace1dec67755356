// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::EventStore;
use chrono::TimeZone;

fn store() -> EventStore {
    EventStore::in_memory().unwrap()
}

fn at(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap()
}

fn log(
    store: &EventStore,
    session: &str,
    event: SessionEventKind,
    ts_ms: i64,
) {
    store
        .log_session_event_at(session, 1, "implement", event, None, None, at(ts_ms))
        .unwrap();
}

#[test]
fn session_state_is_latest_event() {
    let s = store();
    log(&s, "1-implement", SessionEventKind::Started, 1_000);
    log(&s, "1-implement", SessionEventKind::Active, 2_000);
    log(&s, "1-implement", SessionEventKind::Idle, 3_000);

    let state = s.get_session_state("1-implement").unwrap().unwrap();
    assert_eq!(state.event, SessionEventKind::Idle);
    assert_eq!(state.timestamp, at(3_000));
}

#[test]
fn unknown_session_has_no_state() {
    let s = store();
    assert!(s.get_session_state("ghost").unwrap().is_none());
}

#[test]
fn started_at_ignores_later_events() {
    let s = store();
    log(&s, "1-implement", SessionEventKind::Started, 1_000);
    log(&s, "1-implement", SessionEventKind::FactorySend, 5_000);
    log(&s, "1-implement", SessionEventKind::Steer, 9_000);

    let started = s.get_session_started_at("1-implement").unwrap().unwrap();
    assert_eq!(started, at(1_000));
}

#[test]
fn active_sessions_exclude_exited() {
    let s = store();
    log(&s, "1-implement", SessionEventKind::Started, 1_000);
    log(&s, "2-review", SessionEventKind::Started, 1_000);
    log(&s, "2-review", SessionEventKind::Exited, 2_000);

    let active = s.get_all_active_sessions().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].session_id, "1-implement");
}

#[test]
fn human_intervention_when_no_factory_send() {
    let s = store();
    log(&s, "1-implement", SessionEventKind::Started, 0);
    log(&s, "1-implement", SessionEventKind::Active, 10_000);

    assert!(s.detect_human_intervention("1-implement").unwrap());
}

#[test]
fn orchestrator_attribution_with_recent_send() {
    let s = store();
    log(&s, "1-implement", SessionEventKind::Started, 0);
    log(&s, "1-implement", SessionEventKind::FactorySend, 8_000);
    log(&s, "1-implement", SessionEventKind::Active, 10_000);

    assert!(!s.detect_human_intervention("1-implement").unwrap());
}

#[test]
fn send_at_exactly_five_seconds_is_orchestrator() {
    let s = store();
    log(&s, "1-implement", SessionEventKind::Started, 0);
    log(&s, "1-implement", SessionEventKind::FactorySend, 5_000);
    log(&s, "1-implement", SessionEventKind::Active, 10_000);

    // Boundary case: factory_send at active - 5.000s is orchestrator-sent
    assert!(!s.detect_human_intervention("1-implement").unwrap());
}

#[test]
fn send_older_than_five_seconds_is_human() {
    let s = store();
    log(&s, "1-implement", SessionEventKind::Started, 0);
    log(&s, "1-implement", SessionEventKind::FactorySend, 4_999);
    log(&s, "1-implement", SessionEventKind::Active, 10_000);

    assert!(s.detect_human_intervention("1-implement").unwrap());
}

#[test]
fn no_active_event_means_no_intervention() {
    let s = store();
    log(&s, "1-implement", SessionEventKind::Started, 0);
    assert!(!s.detect_human_intervention("1-implement").unwrap());
}

#[test]
fn recent_steer_within_window() {
    let s = store();
    log(&s, "1-implement", SessionEventKind::Steer, 60_000);

    let now = at(120_000);
    assert!(s
        .has_recent_steer_at("1-implement", Duration::from_secs(120), now)
        .unwrap());
    assert!(!s
        .has_recent_steer_at("1-implement", Duration::from_secs(30), now)
        .unwrap());
}
