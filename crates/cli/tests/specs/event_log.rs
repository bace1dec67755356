//! The `event log` hook callback writes through to the event store.

use assert_cmd::Command;
use factory_storage::EventStore;
use serial_test::serial;

#[test]
#[serial]
fn event_log_appends_session_event() {
    let home = tempfile::tempdir().unwrap();

    Command::cargo_bin("factory")
        .unwrap()
        .env("FACTORY_HOME", home.path())
        .args([
            "event", "log", "--session", "42-implement", "--issue", "42", "--stage",
            "implement", "--event", "idle",
        ])
        .assert()
        .success();

    let store = EventStore::open(&home.path().join("factory.db")).unwrap();
    let state = store.get_session_state("42-implement").unwrap().unwrap();
    assert_eq!(state.event, factory_core::SessionEventKind::Idle);
    assert_eq!(state.issue, 42);
    assert_eq!(state.stage, "implement");
}

#[test]
#[serial]
fn event_log_rejects_unknown_kind() {
    let home = tempfile::tempdir().unwrap();

    Command::cargo_bin("factory")
        .unwrap()
        .env("FACTORY_HOME", home.path())
        .args([
            "event", "log", "--session", "s", "--issue", "1", "--stage", "g", "--event",
            "jumping",
        ])
        .assert()
        .failure();
}
