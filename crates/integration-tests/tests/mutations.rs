//! Integration tests for session mutations and read state.

use std::collections::HashSet;
use std::time::Duration;

use futures::future::join_all;

use bankdesk_admin::db::{StoreOp, SupportStore};
use bankdesk_admin::services::GatewayError;
use bankdesk_core::{SessionStatus, TenantKey};
use bankdesk_integration_tests::{Desk, at};

#[tokio::test]
async fn test_close_is_idempotent() {
    let desk = Desk::new();
    let store = desk.store(TenantKey::Cayman);
    let session = store.open_session(None, "Ana", None, at(1)).expect("open");
    let gateway = desk.gateway();

    gateway
        .close_session(session.session_ref())
        .await
        .expect("first close");
    gateway
        .close_session(session.session_ref())
        .await
        .expect("second close");

    let sessions = store.sessions_snapshot().expect("sessions");
    assert_eq!(sessions[0].status, SessionStatus::Closed);
}

#[tokio::test]
async fn test_delete_leaves_no_messages_under_any_latency() {
    let latencies = [None, Some(1), Some(3), Some(7)];

    for latency in latencies {
        let desk = Desk::new();
        let store = desk.store(TenantKey::Bahamas);
        store.set_latency(latency.map(Duration::from_millis));

        let session = store.open_session(None, "Ana", None, at(1)).expect("open");
        for minute in 2..7 {
            store
                .post_client_message(session.id, "Hello", at(minute))
                .expect("post");
        }

        desk.gateway()
            .delete_session(session.session_ref())
            .await
            .expect("delete");

        assert!(store.sessions_snapshot().expect("sessions").is_empty());
        assert!(store.messages_snapshot().expect("messages").is_empty());
    }
}

#[tokio::test]
async fn test_concurrent_deletes_across_tenants_with_mixed_latency() {
    let desk = Desk::new();
    let mut sessions = Vec::new();
    for (key, latency_ms) in [
        (TenantKey::Cayman, 5),
        (TenantKey::Bahamas, 0),
        (TenantKey::Bermuda, 2),
    ] {
        let store = desk.store(key);
        let session = store.open_session(None, "Ana", None, at(1)).expect("open");
        store
            .post_client_message(session.id, "One", at(2))
            .expect("post");
        store
            .post_client_message(session.id, "Two", at(3))
            .expect("post");
        store.set_latency(Some(Duration::from_millis(latency_ms)));
        sessions.push(session.session_ref());
    }

    let gateway = desk.gateway();
    let results = join_all(sessions.iter().map(|s| gateway.delete_session(*s))).await;
    assert!(results.iter().all(Result::is_ok));

    for store in desk.stores() {
        assert!(store.sessions_snapshot().expect("sessions").is_empty());
        assert!(store.messages_snapshot().expect("messages").is_empty());
    }
}

#[tokio::test]
async fn test_failed_message_delete_keeps_session() {
    let desk = Desk::new();
    let store = desk.store(TenantKey::Cayman);
    let session = store.open_session(None, "Ana", None, at(1)).expect("open");
    store
        .post_client_message(session.id, "Hello", at(2))
        .expect("post");
    store.fail_operation(StoreOp::DeleteMessages);

    let err = desk
        .gateway()
        .delete_session(session.session_ref())
        .await
        .expect_err("delete must fail");
    assert!(matches!(err, GatewayError::Store(_)));
    assert_eq!(store.sessions_snapshot().expect("sessions").len(), 1);
    assert_eq!(store.messages_snapshot().expect("messages").len(), 1);
}

#[tokio::test]
async fn test_bulk_delete_continues_past_failures() {
    let desk = Desk::new();
    let ok = desk
        .store(TenantKey::Cayman)
        .open_session(None, "A", None, at(1))
        .expect("open");
    let broken = desk
        .store(TenantKey::Bahamas)
        .open_session(None, "B", None, at(2))
        .expect("open");
    let also_ok = desk
        .store(TenantKey::Bermuda)
        .open_session(None, "C", None, at(3))
        .expect("open");
    desk.store(TenantKey::Bahamas).set_offline(true);

    let report = desk
        .gateway()
        .bulk_delete(&[
            ok.session_ref(),
            broken.session_ref(),
            also_ok.session_ref(),
        ])
        .await;
    assert_eq!(report.deleted, 2);
    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.failed[0].session, broken.session_ref());
}

#[tokio::test]
async fn test_read_state_never_reverts() {
    let desk = Desk::new();
    let store = desk.store(TenantKey::Cayman);
    let session = store.open_session(None, "Ana", None, at(1)).expect("open");
    store
        .post_client_message(session.id, "First", at(2))
        .expect("post");
    store
        .post_client_message(session.id, "Second", at(3))
        .expect("post");

    let mut thread = desk.thread();
    thread.select(session.session_ref());
    thread.poll().await.expect("poll");
    let read: HashSet<_> = store
        .messages_snapshot()
        .expect("messages")
        .into_iter()
        .filter(|m| m.read_by_admin)
        .map(|m| m.id)
        .collect();
    assert_eq!(read.len(), 2);

    // Everything else the desk can do to this session
    desk.gateway()
        .send_message(session.session_ref(), "Support", "Looking into it")
        .await
        .expect("send");
    store
        .post_client_message(session.id, "Third", at(4))
        .expect("post");
    thread.poll().await.expect("poll");
    thread.close();
    thread.select(session.session_ref());
    thread.poll().await.expect("poll");
    desk.gateway()
        .close_session(session.session_ref())
        .await
        .expect("close");
    let remarked = store
        .mark_read_by_admin(&read.iter().copied().collect::<Vec<_>>())
        .await
        .expect("mark");
    assert_eq!(remarked, 0);

    let messages = store.messages_snapshot().expect("messages");
    assert!(messages.iter().all(|m| m.read_by_admin));
    assert!(read.iter().all(|id| messages.iter().any(|m| m.id == *id)));
}
