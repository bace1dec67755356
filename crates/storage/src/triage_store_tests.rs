// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sample(issue: u64, status: TriageStatus) -> TriageState {
    TriageState {
        issue,
        repo: "acme/widgets".to_string(),
        current_stage: "classify".to_string(),
        status,
        current_session: String::new(),
        stage_history: Vec::new(),
        updated_at: Utc::now(),
        title: "A bug".to_string(),
        body: String::new(),
    }
}

#[test]
fn put_get_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = TriageStore::new(dir.path());
    store.put(&sample(9, TriageStatus::Pending)).unwrap();

    let loaded = store.get(9).unwrap();
    assert_eq!(loaded.issue, 9);
    assert_eq!(loaded.status, TriageStatus::Pending);
}

#[test]
fn first_pending_and_in_progress() {
    let dir = tempfile::tempdir().unwrap();
    let store = TriageStore::new(dir.path());
    store.put(&sample(5, TriageStatus::Completed)).unwrap();
    store.put(&sample(9, TriageStatus::Pending)).unwrap();
    store.put(&sample(3, TriageStatus::Pending)).unwrap();

    assert_eq!(store.first_pending().unwrap().unwrap().issue, 3);
    assert!(store.in_progress().unwrap().is_none());

    store
        .update(3, |s| s.status = TriageStatus::InProgress)
        .unwrap();
    assert_eq!(store.in_progress().unwrap().unwrap().issue, 3);
}

#[test]
fn outcome_files_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = TriageStore::new(dir.path());

    assert!(store.read_outcome(9, "classify").unwrap().is_none());

    let outcome = TriageOutcome {
        outcome: "yes".to_string(),
        summary: "stale context".to_string(),
    };
    store.write_outcome(9, "classify", &outcome).unwrap();
    assert_eq!(store.read_outcome(9, "classify").unwrap().unwrap(), outcome);
}

#[test]
fn advance_lock_is_exclusive() {
    let dir = tempfile::tempdir().unwrap();
    let store = TriageStore::new(dir.path());

    let lock = store.try_advance_lock().unwrap();
    assert!(lock.is_some());

    // Second acquisition fails while held
    assert!(store.try_advance_lock().unwrap().is_none());

    drop(lock);
    // Released on drop
    assert!(store.try_advance_lock().unwrap().is_some());
}

#[test]
fn stale_lock_is_reclaimed() {
    let dir = tempfile::tempdir().unwrap();
    let store = TriageStore::new(dir.path());
    let lock_path = dir.path().join(".advance.lock");

    std::fs::write(&lock_path, b"").unwrap();
    // Backdate the lock beyond the staleness cutoff
    let old = std::time::SystemTime::now() - (ADVANCE_LOCK_STALE_AFTER + Duration::from_secs(60));
    let file = std::fs::OpenOptions::new()
        .write(true)
        .open(&lock_path)
        .unwrap();
    file.set_modified(old).unwrap();
    drop(file);

    let lock = store.try_advance_lock().unwrap();
    assert!(lock.is_some(), "stale lock should be reclaimed");
}
