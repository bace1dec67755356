// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn spawn_send_kill_lifecycle() {
    let fake = FakeSessionAdapter::new();
    fake.new_session("42-implement", Path::new("/tmp"), "claude", &[])
        .await
        .unwrap();
    assert!(fake.has_session("42-implement").await.unwrap());

    fake.send_keys("42-implement", "hello").await.unwrap();
    fake.send_buffer("42-implement", "multi\nline").await.unwrap();
    fake.send_enter("42-implement").await.unwrap();

    assert_eq!(
        fake.sent_text("42-implement"),
        vec!["hello".to_string(), "multi\nline".to_string()]
    );

    fake.kill_session("42-implement").await.unwrap();
    assert!(!fake.has_session("42-implement").await.unwrap());
}

#[tokio::test]
async fn send_to_unknown_session_fails() {
    let fake = FakeSessionAdapter::new();
    assert!(matches!(
        fake.send_keys("ghost", "hi").await,
        Err(SessionError::NotFound(_))
    ));
}

#[tokio::test]
async fn pane_frames_advance_and_repeat() {
    let fake = FakeSessionAdapter::new();
    fake.set_pane_frames("s", vec!["one".to_string(), "two".to_string()]);

    assert_eq!(fake.capture_pane("s", 100).await.unwrap(), "one");
    assert_eq!(fake.capture_pane("s", 100).await.unwrap(), "two");
    // Last frame repeats
    assert_eq!(fake.capture_pane("s", 100).await.unwrap(), "two");
}

#[tokio::test]
async fn fail_next_spawn_fires_once() {
    let fake = FakeSessionAdapter::new();
    fake.fail_next_spawn();
    assert!(fake
        .new_session("s", Path::new("/tmp"), "claude", &[])
        .await
        .is_err());
    assert!(fake
        .new_session("s", Path::new("/tmp"), "claude", &[])
        .await
        .is_ok());
}
