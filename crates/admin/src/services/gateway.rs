//! Write path for support sessions and messages.
//!
//! Every mutation goes to the tenant that owns the target session. Nothing
//! is retried silently: failures are returned to the operator, with the
//! drafted text preserved for a failed send.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use bankdesk_core::SessionStatus;

use crate::access::{ResolutionError, resolve_access};
use crate::db::{RepositoryError, SupportStore};
use crate::models::{ChatMessage, ChatSession, NewChatMessage, SessionRef, StaffIdentity};
use crate::tenancy::{RegistryError, TenantPools};

/// A mutation that did not apply.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("session {0} not found")]
    SessionNotFound(SessionRef),

    #[error("session {0} is not visible to this staff member")]
    NotVisible(SessionRef),

    #[error("message body is empty")]
    EmptyMessage,

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("store error: {0}")]
    Store(#[from] RepositoryError),
}

/// A failed send. Carries the draft so the operator can retry it.
#[derive(Debug, Error)]
#[error("failed to send message to {session}: {source}")]
pub struct SendFailure {
    pub session: SessionRef,
    pub draft: String,
    #[source]
    pub source: GatewayError,
}

/// One session a bulk delete could not remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkDeleteFailure {
    pub session: SessionRef,
    pub reason: String,
}

/// Outcome of a bulk delete. Partial failure is a result, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkDeleteReport {
    pub deleted: usize,
    pub failed: Vec<BulkDeleteFailure>,
}

impl BulkDeleteReport {
    pub fn record_failure(&mut self, session: SessionRef, reason: impl ToString) {
        self.failed.push(BulkDeleteFailure {
            session,
            reason: reason.to_string(),
        });
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Applies staff mutations to the owning tenant.
#[derive(Debug, Clone)]
pub struct MutationGateway {
    pools: TenantPools,
}

impl MutationGateway {
    #[must_use]
    pub const fn new(pools: TenantPools) -> Self {
        Self { pools }
    }

    fn store(&self, session: SessionRef) -> Result<Arc<dyn SupportStore>, GatewayError> {
        Ok(Arc::clone(self.pools.store(session.tenant)?))
    }

    /// Load `session` and check that `staff` may act on it.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::SessionNotFound` or `GatewayError::NotVisible`,
    /// or `GatewayError::Resolution` when access cannot be determined (no
    /// access is assumed in that case).
    #[instrument(skip(self, staff), fields(staff_id = %staff.id, session = %session))]
    pub async fn ensure_visible(
        &self,
        staff: &StaffIdentity,
        session: SessionRef,
    ) -> Result<ChatSession, GatewayError> {
        let store = self.store(session)?;
        let record = store
            .get_session(session.session_id)
            .await?
            .ok_or(GatewayError::SessionNotFound(session))?;

        let access = resolve_access(staff, store.as_ref()).await?;
        if !access.permits(record.client_user_id) {
            return Err(GatewayError::NotVisible(session));
        }
        Ok(record)
    }

    /// Post a staff reply and bump the session's activity timestamps.
    ///
    /// # Errors
    ///
    /// Returns `SendFailure` holding `body` unchanged if the message could
    /// not be stored.
    #[instrument(skip(self, body), fields(session = %session))]
    pub async fn send_message(
        &self,
        session: SessionRef,
        sender_name: &str,
        body: &str,
    ) -> Result<ChatMessage, SendFailure> {
        let fail = |source: GatewayError| {
            error!(session = %session, error = %source, "Failed to send support message");
            SendFailure {
                session,
                draft: body.to_owned(),
                source,
            }
        };

        let text = body.trim();
        if text.is_empty() {
            return Err(fail(GatewayError::EmptyMessage));
        }

        let store = self.store(session).map_err(fail)?;
        let message = store
            .insert_message(&NewChatMessage::staff_reply(
                session.session_id,
                sender_name,
                text,
            ))
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => fail(GatewayError::SessionNotFound(session)),
                other => fail(GatewayError::Store(other)),
            })?;

        // The message is stored; a missed bump only delays its place in the inbox.
        if let Err(e) = store
            .touch_session(session.session_id, message.created_at)
            .await
        {
            warn!(session = %session, error = %e, "Message stored but session timestamps not bumped");
        }

        Ok(message)
    }

    /// Mark `session` closed. Closing a closed session succeeds.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the session does not exist or the store fails.
    #[instrument(skip(self), fields(session = %session))]
    pub async fn close_session(&self, session: SessionRef) -> Result<(), GatewayError> {
        let store = self.store(session)?;
        let found = store
            .set_session_status(session.session_id, SessionStatus::Closed)
            .await
            .inspect_err(|e| error!(session = %session, error = %e, "Failed to close session"))?;
        if !found {
            return Err(GatewayError::SessionNotFound(session));
        }
        info!(session = %session, "Support session closed");
        Ok(())
    }

    /// Hard-delete `session`: its messages first, then the session row.
    ///
    /// If deleting the messages fails the session row is left in place.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if either step fails or the session does not
    /// exist.
    #[instrument(skip(self), fields(session = %session))]
    pub async fn delete_session(&self, session: SessionRef) -> Result<(), GatewayError> {
        let store = self.store(session)?;

        let removed = store
            .delete_messages(session.session_id)
            .await
            .inspect_err(|e| {
                error!(session = %session, error = %e, "Failed to delete session messages");
            })?;

        let found = store
            .delete_session(session.session_id)
            .await
            .inspect_err(|e| error!(session = %session, error = %e, "Failed to delete session"))?;
        if !found {
            return Err(GatewayError::SessionNotFound(session));
        }

        info!(session = %session, messages = removed, "Support session deleted");
        Ok(())
    }

    /// Delete each session independently; one failure never stops the rest.
    #[instrument(skip_all, fields(count = sessions.len()))]
    pub async fn bulk_delete(&self, sessions: &[SessionRef]) -> BulkDeleteReport {
        let mut report = BulkDeleteReport::default();
        for &session in sessions {
            match self.delete_session(session).await {
                Ok(()) => report.deleted += 1,
                Err(e) => report.record_failure(session, e),
            }
        }

        if !report.is_complete() {
            warn!(
                deleted = report.deleted,
                failed = report.failed_count(),
                "Bulk delete partially failed"
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, StoreOp};
    use bankdesk_core::{ChatSessionId, RelationKind, RoleFlags, SenderType, TenantKey};
    use chrono::Utc;
    use std::time::Duration;

    fn setup() -> (Arc<MemoryStore>, MutationGateway) {
        let store = Arc::new(MemoryStore::new(TenantKey::Cayman));
        let pools = TenantPools::from_stores([Arc::clone(&store) as Arc<dyn SupportStore>]);
        (store, MutationGateway::new(pools))
    }

    fn open(store: &MemoryStore, messages: usize) -> SessionRef {
        let session = store
            .open_session(None, "Ana", None, Utc::now())
            .expect("open");
        for i in 0..messages {
            store
                .post_client_message(session.id, &format!("m{i}"), Utc::now())
                .expect("post");
        }
        session.session_ref()
    }

    #[tokio::test]
    async fn test_send_message_flags_and_bump() {
        let (store, gateway) = setup();
        let session = open(&store, 1);
        let before = store
            .get_session(session.session_id)
            .await
            .expect("get")
            .expect("exists");

        let message = gateway
            .send_message(session, "Support", "  How can I help?  ")
            .await
            .expect("send");
        assert_eq!(message.sender_type, SenderType::Admin);
        assert_eq!(message.body, "How can I help?");
        assert!(message.read_by_admin);
        assert!(!message.read_by_client);

        let after = store
            .get_session(session.session_id)
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(after.last_message_at, message.created_at);
        assert!(after.updated_at >= before.updated_at);
    }

    #[tokio::test]
    async fn test_send_failure_keeps_draft() {
        let (store, gateway) = setup();
        let session = open(&store, 0);
        store.fail_operation(StoreOp::InsertMessage);

        let failure = gateway
            .send_message(session, "Support", "Draft reply")
            .await
            .unwrap_err();
        assert_eq!(failure.draft, "Draft reply");
        assert_eq!(failure.session, session);
        assert!(matches!(failure.source, GatewayError::Store(_)));
    }

    #[tokio::test]
    async fn test_send_empty_body_is_rejected() {
        let (store, gateway) = setup();
        let session = open(&store, 0);
        let failure = gateway
            .send_message(session, "Support", "   ")
            .await
            .unwrap_err();
        assert!(matches!(failure.source, GatewayError::EmptyMessage));
        assert_eq!(failure.draft, "   ");
    }

    #[tokio::test]
    async fn test_send_to_missing_session() {
        let (_store, gateway) = setup();
        let missing = SessionRef::new(TenantKey::Cayman, ChatSessionId::new(99));
        let failure = gateway
            .send_message(missing, "Support", "hello")
            .await
            .unwrap_err();
        assert!(matches!(failure.source, GatewayError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (store, gateway) = setup();
        let session = open(&store, 0);

        gateway.close_session(session).await.expect("first close");
        gateway.close_session(session).await.expect("second close");

        let record = store
            .get_session(session.session_id)
            .await
            .expect("get")
            .expect("exists");
        assert_eq!(record.status, SessionStatus::Closed);
    }

    #[tokio::test]
    async fn test_delete_removes_messages_and_session() {
        let (store, gateway) = setup();
        let session = open(&store, 3);

        gateway.delete_session(session).await.expect("delete");
        assert!(store.sessions_snapshot().expect("snapshot").is_empty());
        assert!(store.messages_snapshot().expect("snapshot").is_empty());
    }

    #[tokio::test]
    async fn test_delete_keeps_session_when_message_delete_fails() {
        let (store, gateway) = setup();
        let session = open(&store, 2);
        store.fail_operation(StoreOp::DeleteMessages);

        assert!(gateway.delete_session(session).await.is_err());
        assert_eq!(store.sessions_snapshot().expect("snapshot").len(), 1);
        assert_eq!(store.messages_snapshot().expect("snapshot").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_with_slow_store() {
        let (store, gateway) = setup();
        let session = open(&store, 4);
        store.set_latency(Some(Duration::from_millis(750)));

        gateway.delete_session(session).await.expect("delete");
        assert!(store.sessions_snapshot().expect("snapshot").is_empty());
        assert!(store.messages_snapshot().expect("snapshot").is_empty());
    }

    #[tokio::test]
    async fn test_bulk_delete_continues_past_failures() {
        let (store, gateway) = setup();
        let first = open(&store, 1);
        let second = open(&store, 0);
        let missing = SessionRef::new(TenantKey::Cayman, ChatSessionId::new(404));
        let other_tenant = SessionRef::new(TenantKey::Bermuda, ChatSessionId::new(1));

        let report = gateway
            .bulk_delete(&[first, missing, second, other_tenant])
            .await;
        assert_eq!(report.deleted, 2);
        assert_eq!(report.failed_count(), 2);
        assert_eq!(report.failed[0].session, missing);
        assert_eq!(report.failed[1].session, other_tenant);
        assert!(store.sessions_snapshot().expect("snapshot").is_empty());
    }

    #[tokio::test]
    async fn test_ensure_visible() {
        let (store, gateway) = setup();
        let client = store
            .add_user("Client", None, RoleFlags::default())
            .expect("user");
        let manager = store
            .add_user(
                "Manager",
                None,
                RoleFlags {
                    is_manager: true,
                    ..RoleFlags::default()
                },
            )
            .expect("user");
        let mine = store
            .open_session(Some(client.id), "Client", None, Utc::now())
            .expect("open")
            .session_ref();
        let anonymous = open(&store, 0);

        let err = gateway
            .ensure_visible(&manager.as_staff(), mine)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotVisible(_)));

        store
            .insert_edge(&crate::models::NewHierarchyEdge {
                superior_id: manager.id,
                subordinate_id: client.id,
                kind: RelationKind::ManagerToUser,
            })
            .await
            .expect("edge");
        let record = gateway
            .ensure_visible(&manager.as_staff(), mine)
            .await
            .expect("visible");
        assert_eq!(record.client_user_id, Some(client.id));

        let err = gateway
            .ensure_visible(&manager.as_staff(), anonymous)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotVisible(_)));

        store.fail_operation(StoreOp::ReadEdges);
        let err = gateway
            .ensure_visible(&manager.as_staff(), mine)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Resolution(_)));
    }
}
