//! In-memory tenant store.
//!
//! Mirrors the `PostgreSQL` schema closely enough to run the desk without
//! a database: sequences per table, the unique edge constraint, and the
//! non-cascading foreign key from messages to sessions. Also counts the
//! operations it serves and can be switched offline or told to fail
//! specific operations, which the test suites rely on.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bankdesk_core::{
    ChatMessageId, ChatSessionId, HierarchyEdgeId, RelationKind, RoleFlags, SenderType,
    SessionStatus, TenantKey, UserId,
};

use super::{RepositoryError, SupportStore};
use crate::models::{
    ChatMessage, ChatSession, HierarchyEdge, NewChatMessage, NewHierarchyEdge, UserRecord,
};

/// Store operations that can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Ping,
    GetUser,
    SearchUsers,
    ReadEdges,
    WriteEdges,
    ListSessions,
    GetSession,
    UpdateSession,
    DeleteSession,
    ListMessages,
    CountUnread,
    InsertMessage,
    MarkRead,
    DeleteMessages,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i32,
    users: BTreeMap<UserId, UserRecord>,
    edges: BTreeMap<HierarchyEdgeId, HierarchyEdge>,
    sessions: BTreeMap<ChatSessionId, ChatSession>,
    messages: BTreeMap<ChatMessageId, ChatMessage>,
}

impl MemoryState {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// A tenant store held entirely in memory.
#[derive(Debug)]
pub struct MemoryStore {
    tenant: TenantKey,
    state: Mutex<MemoryState>,
    operations: AtomicU64,
    offline: AtomicBool,
    failing: Mutex<HashSet<StoreOp>>,
    latency: Mutex<Option<Duration>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(tenant: TenantKey) -> Self {
        Self {
            tenant,
            state: Mutex::new(MemoryState::default()),
            operations: AtomicU64::new(0),
            offline: AtomicBool::new(false),
            failing: Mutex::new(HashSet::new()),
            latency: Mutex::new(None),
        }
    }

    /// Number of store operations served or attempted so far.
    #[must_use]
    pub fn operations(&self) -> u64 {
        self.operations.load(Ordering::SeqCst)
    }

    /// While offline, every operation fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make one kind of operation fail until [`MemoryStore::clear_failures`].
    pub fn fail_operation(&self, op: StoreOp) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(op);
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.clear();
        }
    }

    /// Delay every operation by `latency` (suspends, does not block).
    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut current) = self.latency.lock() {
            *current = latency;
        }
    }

    // -------------------------------------------------------------------------
    // Seeding (stands in for user management and the client-facing widget)
    // -------------------------------------------------------------------------

    /// Insert a user row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Unavailable` if the state lock is poisoned.
    pub fn add_user(
        &self,
        name: &str,
        email: Option<&str>,
        roles: RoleFlags,
    ) -> Result<UserRecord, RepositoryError> {
        let mut state = self.state()?;
        let user = UserRecord {
            id: UserId::new(state.next_id()),
            tenant: self.tenant,
            name: name.to_owned(),
            email: email.map(ToOwned::to_owned),
            roles,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    /// Open a session as the client-facing widget would.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Unavailable` if the state lock is poisoned.
    pub fn open_session(
        &self,
        client_user_id: Option<UserId>,
        client_name: &str,
        client_email: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<ChatSession, RepositoryError> {
        let mut state = self.state()?;
        let session = ChatSession {
            id: ChatSessionId::new(state.next_id()),
            tenant: self.tenant,
            client_user_id,
            client_name: client_name.to_owned(),
            client_email: client_email.map(ToOwned::to_owned),
            status: SessionStatus::Active,
            created_at: at,
            updated_at: at,
            last_message_at: at,
        };
        state.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    /// Post a message as the client, bumping the session timestamps.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the session doesn't exist.
    pub fn post_client_message(
        &self,
        session_id: ChatSessionId,
        body: &str,
        at: DateTime<Utc>,
    ) -> Result<ChatMessage, RepositoryError> {
        let mut state = self.state()?;
        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or(RepositoryError::NotFound)?;
        session.updated_at = at;
        session.last_message_at = at;
        let sender_name = session.client_name.clone();

        let message = ChatMessage {
            id: ChatMessageId::new(state.next_id()),
            session_id,
            sender_type: SenderType::Client,
            sender_name,
            body: body.to_owned(),
            created_at: at,
            read_by_admin: false,
            read_by_client: true,
        };
        state.messages.insert(message.id, message.clone());
        Ok(message)
    }

    /// Current sessions, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Unavailable` if the state lock is poisoned.
    pub fn sessions_snapshot(&self) -> Result<Vec<ChatSession>, RepositoryError> {
        Ok(self.state()?.sessions.values().cloned().collect())
    }

    /// Current messages of every session, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Unavailable` if the state lock is poisoned.
    pub fn messages_snapshot(&self) -> Result<Vec<ChatMessage>, RepositoryError> {
        Ok(self.state()?.messages.values().cloned().collect())
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("memory store lock poisoned".to_owned()))
    }

    /// Count the operation, apply latency, and fail it if configured to.
    async fn enter(&self, op: StoreOp) -> Result<(), RepositoryError> {
        self.operations.fetch_add(1, Ordering::SeqCst);

        let latency = self.latency.lock().ok().and_then(|l| *l);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(format!(
                "{} store is offline",
                self.tenant
            )));
        }

        let failing = self
            .failing
            .lock()
            .map(|f| f.contains(&op))
            .unwrap_or(false);
        if failing {
            return Err(RepositoryError::Unavailable(format!(
                "{} store rejected {op:?}",
                self.tenant
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl SupportStore for MemoryStore {
    fn tenant(&self) -> TenantKey {
        self.tenant
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.enter(StoreOp::Ping).await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>, RepositoryError> {
        self.enter(StoreOp::GetUser).await?;
        Ok(self.state()?.users.get(&id).cloned())
    }

    async fn search_users(
        &self,
        query: &str,
        limit: i64,
    ) -> Result<Vec<UserRecord>, RepositoryError> {
        self.enter(StoreOp::SearchUsers).await?;
        let needle = query.to_lowercase();
        let limit = usize::try_from(limit).unwrap_or(0);

        let mut matches: Vec<UserRecord> = self
            .state()?
            .users
            .values()
            .filter(|u| {
                u.name.to_lowercase().contains(&needle)
                    || u
                        .email
                        .as_deref()
                        .is_some_and(|e| e.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        matches.truncate(limit);
        Ok(matches)
    }

    async fn edges_from_any(
        &self,
        superior_ids: &[UserId],
        kind: RelationKind,
    ) -> Result<Vec<HierarchyEdge>, RepositoryError> {
        self.enter(StoreOp::ReadEdges).await?;
        Ok(self
            .state()?
            .edges
            .values()
            .filter(|e| e.kind == kind && superior_ids.contains(&e.superior_id))
            .cloned()
            .collect())
    }

    async fn list_edges(&self, superior_id: UserId) -> Result<Vec<HierarchyEdge>, RepositoryError> {
        self.enter(StoreOp::ReadEdges).await?;
        Ok(self
            .state()?
            .edges
            .values()
            .filter(|e| e.superior_id == superior_id)
            .cloned()
            .collect())
    }

    async fn insert_edge(&self, edge: &NewHierarchyEdge) -> Result<HierarchyEdge, RepositoryError> {
        self.enter(StoreOp::WriteEdges).await?;
        let mut state = self.state()?;

        let duplicate = state.edges.values().any(|e| {
            e.superior_id == edge.superior_id
                && e.subordinate_id == edge.subordinate_id
                && e.kind == edge.kind
        });
        if duplicate {
            return Err(RepositoryError::Conflict(
                "hierarchy edge already exists".to_owned(),
            ));
        }

        let created = HierarchyEdge {
            id: HierarchyEdgeId::new(state.next_id()),
            superior_id: edge.superior_id,
            subordinate_id: edge.subordinate_id,
            kind: edge.kind,
            tenant: self.tenant,
            created_at: Utc::now(),
        };
        state.edges.insert(created.id, created.clone());
        Ok(created)
    }

    async fn delete_edge(&self, id: HierarchyEdgeId) -> Result<bool, RepositoryError> {
        self.enter(StoreOp::WriteEdges).await?;
        Ok(self.state()?.edges.remove(&id).is_some())
    }

    async fn list_sessions(&self) -> Result<Vec<ChatSession>, RepositoryError> {
        self.enter(StoreOp::ListSessions).await?;
        Ok(self.state()?.sessions.values().cloned().collect())
    }

    async fn list_sessions_for_clients(
        &self,
        client_ids: &[UserId],
    ) -> Result<Vec<ChatSession>, RepositoryError> {
        self.enter(StoreOp::ListSessions).await?;
        Ok(self
            .state()?
            .sessions
            .values()
            .filter(|s| s.client_user_id.is_some_and(|id| client_ids.contains(&id)))
            .cloned()
            .collect())
    }

    async fn get_session(
        &self,
        id: ChatSessionId,
    ) -> Result<Option<ChatSession>, RepositoryError> {
        self.enter(StoreOp::GetSession).await?;
        Ok(self.state()?.sessions.get(&id).cloned())
    }

    async fn set_session_status(
        &self,
        id: ChatSessionId,
        status: SessionStatus,
    ) -> Result<bool, RepositoryError> {
        self.enter(StoreOp::UpdateSession).await?;
        let mut state = self.state()?;
        Ok(state
            .sessions
            .get_mut(&id)
            .map(|s| {
                s.status = status;
                s.updated_at = Utc::now();
            })
            .is_some())
    }

    async fn touch_session(
        &self,
        id: ChatSessionId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.enter(StoreOp::UpdateSession).await?;
        let mut state = self.state()?;
        let session = state.sessions.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        session.updated_at = at;
        session.last_message_at = at;
        Ok(())
    }

    async fn delete_session(&self, id: ChatSessionId) -> Result<bool, RepositoryError> {
        self.enter(StoreOp::DeleteSession).await?;
        let mut state = self.state()?;
        if state.messages.values().any(|m| m.session_id == id) {
            return Err(RepositoryError::Conflict(format!(
                "messages still reference session {id}"
            )));
        }
        Ok(state.sessions.remove(&id).is_some())
    }

    async fn list_messages(
        &self,
        session_id: ChatSessionId,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        self.enter(StoreOp::ListMessages).await?;
        let mut messages: Vec<ChatMessage> = self
            .state()?
            .messages
            .values()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(messages)
    }

    async fn count_unread_client_messages(
        &self,
        session_id: ChatSessionId,
    ) -> Result<u64, RepositoryError> {
        self.enter(StoreOp::CountUnread).await?;
        let count = self
            .state()?
            .messages
            .values()
            .filter(|m| m.session_id == session_id && m.is_unread_client_message())
            .count();
        Ok(count as u64)
    }

    async fn insert_message(
        &self,
        message: &NewChatMessage,
    ) -> Result<ChatMessage, RepositoryError> {
        self.enter(StoreOp::InsertMessage).await?;
        let mut state = self.state()?;
        if !state.sessions.contains_key(&message.session_id) {
            return Err(RepositoryError::NotFound);
        }

        let created = ChatMessage {
            id: ChatMessageId::new(state.next_id()),
            session_id: message.session_id,
            sender_type: message.sender_type,
            sender_name: message.sender_name.clone(),
            body: message.body.clone(),
            created_at: Utc::now(),
            read_by_admin: message.read_by_admin,
            read_by_client: message.read_by_client,
        };
        state.messages.insert(created.id, created.clone());
        Ok(created)
    }

    async fn mark_read_by_admin(&self, ids: &[ChatMessageId]) -> Result<u64, RepositoryError> {
        self.enter(StoreOp::MarkRead).await?;
        let mut state = self.state()?;
        let mut changed = 0;
        for id in ids {
            if let Some(message) = state.messages.get_mut(id)
                && !message.read_by_admin
            {
                message.read_by_admin = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete_messages(&self, session_id: ChatSessionId) -> Result<u64, RepositoryError> {
        self.enter(StoreOp::DeleteMessages).await?;
        let mut state = self.state()?;
        let before = state.messages.len();
        state.messages.retain(|_, m| m.session_id != session_id);
        Ok((before - state.messages.len()) as u64)
    }
}
