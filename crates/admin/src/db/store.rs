//! The per-tenant store interface.
//!
//! Every tenant is reached through one `SupportStore`. Services never hold
//! a raw pool; they are handed the store of the tenant that owns the
//! record they touch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bankdesk_core::{
    ChatMessageId, ChatSessionId, HierarchyEdgeId, RelationKind, SessionStatus, TenantKey, UserId,
};

use super::{ChatRepository, HierarchyRepository, RepositoryError, UserRepository};
use crate::models::{
    ChatMessage, ChatSession, HierarchyEdge, NewChatMessage, NewHierarchyEdge, UserRecord,
};

/// Operations the support desk needs from one tenant's store.
#[async_trait]
pub trait SupportStore: Send + Sync {
    /// Tenant this store belongs to.
    fn tenant(&self) -> TenantKey;

    /// Cheap round trip used by readiness checks.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Release connections held by this store.
    async fn close(&self) {}

    async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>, RepositoryError>;

    async fn search_users(&self, query: &str, limit: i64)
    -> Result<Vec<UserRecord>, RepositoryError>;

    /// Edges of `kind` whose superior is any of `superior_ids`.
    async fn edges_from_any(
        &self,
        superior_ids: &[UserId],
        kind: RelationKind,
    ) -> Result<Vec<HierarchyEdge>, RepositoryError>;

    /// Edges of `kind` owned by one superior.
    async fn edges_from(
        &self,
        superior_id: UserId,
        kind: RelationKind,
    ) -> Result<Vec<HierarchyEdge>, RepositoryError> {
        self.edges_from_any(&[superior_id], kind).await
    }

    async fn list_edges(&self, superior_id: UserId) -> Result<Vec<HierarchyEdge>, RepositoryError>;

    async fn insert_edge(&self, edge: &NewHierarchyEdge) -> Result<HierarchyEdge, RepositoryError>;

    async fn delete_edge(&self, id: HierarchyEdgeId) -> Result<bool, RepositoryError>;

    async fn list_sessions(&self) -> Result<Vec<ChatSession>, RepositoryError>;

    async fn list_sessions_for_clients(
        &self,
        client_ids: &[UserId],
    ) -> Result<Vec<ChatSession>, RepositoryError>;

    async fn get_session(&self, id: ChatSessionId)
    -> Result<Option<ChatSession>, RepositoryError>;

    /// Returns `false` when the session does not exist.
    async fn set_session_status(
        &self,
        id: ChatSessionId,
        status: SessionStatus,
    ) -> Result<bool, RepositoryError>;

    async fn touch_session(&self, id: ChatSessionId, at: DateTime<Utc>)
    -> Result<(), RepositoryError>;

    /// Returns `false` when the session does not exist.
    async fn delete_session(&self, id: ChatSessionId) -> Result<bool, RepositoryError>;

    /// Messages ordered by `created_at` ascending.
    async fn list_messages(
        &self,
        session_id: ChatSessionId,
    ) -> Result<Vec<ChatMessage>, RepositoryError>;

    async fn count_unread_client_messages(
        &self,
        session_id: ChatSessionId,
    ) -> Result<u64, RepositoryError>;

    async fn insert_message(&self, message: &NewChatMessage)
    -> Result<ChatMessage, RepositoryError>;

    /// Sets `read_by_admin = true`; never clears it.
    async fn mark_read_by_admin(&self, ids: &[ChatMessageId]) -> Result<u64, RepositoryError>;

    async fn delete_messages(&self, session_id: ChatSessionId) -> Result<u64, RepositoryError>;
}

/// `PostgreSQL`-backed tenant store.
#[derive(Debug, Clone)]
pub struct PgSupportStore {
    tenant: TenantKey,
    pool: PgPool,
}

impl PgSupportStore {
    #[must_use]
    pub const fn new(tenant: TenantKey, pool: PgPool) -> Self {
        Self { tenant, pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    const fn chat(&self) -> ChatRepository<'_> {
        ChatRepository::new(&self.pool, self.tenant)
    }

    const fn hierarchy(&self) -> HierarchyRepository<'_> {
        HierarchyRepository::new(&self.pool, self.tenant)
    }

    const fn users(&self) -> UserRepository<'_> {
        UserRepository::new(&self.pool, self.tenant)
    }
}

#[async_trait]
impl SupportStore for PgSupportStore {
    fn tenant(&self) -> TenantKey {
        self.tenant
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>, RepositoryError> {
        self.users().get(id).await
    }

    async fn search_users(
        &self,
        query: &str,
        limit: i64,
    ) -> Result<Vec<UserRecord>, RepositoryError> {
        self.users().search(query, limit).await
    }

    async fn edges_from_any(
        &self,
        superior_ids: &[UserId],
        kind: RelationKind,
    ) -> Result<Vec<HierarchyEdge>, RepositoryError> {
        self.hierarchy().edges_from_any(superior_ids, kind).await
    }

    async fn list_edges(&self, superior_id: UserId) -> Result<Vec<HierarchyEdge>, RepositoryError> {
        self.hierarchy().list_for_superior(superior_id).await
    }

    async fn insert_edge(&self, edge: &NewHierarchyEdge) -> Result<HierarchyEdge, RepositoryError> {
        self.hierarchy().insert(edge).await
    }

    async fn delete_edge(&self, id: HierarchyEdgeId) -> Result<bool, RepositoryError> {
        self.hierarchy().delete(id).await
    }

    async fn list_sessions(&self) -> Result<Vec<ChatSession>, RepositoryError> {
        self.chat().list_sessions().await
    }

    async fn list_sessions_for_clients(
        &self,
        client_ids: &[UserId],
    ) -> Result<Vec<ChatSession>, RepositoryError> {
        self.chat().list_sessions_for_clients(client_ids).await
    }

    async fn get_session(
        &self,
        id: ChatSessionId,
    ) -> Result<Option<ChatSession>, RepositoryError> {
        self.chat().get_session(id).await
    }

    async fn set_session_status(
        &self,
        id: ChatSessionId,
        status: SessionStatus,
    ) -> Result<bool, RepositoryError> {
        self.chat().set_status(id, status).await
    }

    async fn touch_session(
        &self,
        id: ChatSessionId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.chat().touch_session(id, at).await
    }

    async fn delete_session(&self, id: ChatSessionId) -> Result<bool, RepositoryError> {
        self.chat().delete_session(id).await
    }

    async fn list_messages(
        &self,
        session_id: ChatSessionId,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        self.chat().list_messages(session_id).await
    }

    async fn count_unread_client_messages(
        &self,
        session_id: ChatSessionId,
    ) -> Result<u64, RepositoryError> {
        self.chat().count_unread_client_messages(session_id).await
    }

    async fn insert_message(
        &self,
        message: &NewChatMessage,
    ) -> Result<ChatMessage, RepositoryError> {
        self.chat().add_message(message).await
    }

    async fn mark_read_by_admin(&self, ids: &[ChatMessageId]) -> Result<u64, RepositoryError> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.chat().mark_read_by_admin(ids).await
    }

    async fn delete_messages(&self, session_id: ChatSessionId) -> Result<u64, RepositoryError> {
        self.chat().delete_messages(session_id).await
    }
}
