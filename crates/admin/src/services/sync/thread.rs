use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use bankdesk_core::ChatMessageId;

use super::ViewState;
use crate::db::RepositoryError;
use crate::models::{ChatMessage, SessionRef};
use crate::tenancy::{RegistryError, TenantPools};

/// Result of one thread poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// No session is selected.
    Idle,
    /// Message count unchanged; nothing replaced, nothing written.
    Unchanged,
    /// Messages replaced; `marked_read` client messages flipped to read.
    Updated { marked_read: u64 },
}

#[derive(Debug, Error)]
pub enum ThreadSyncError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("failed to load messages for {session}: {source}")]
    Fetch {
        session: SessionRef,
        #[source]
        source: RepositoryError,
    },

    #[error("failed to mark messages read in {session}: {source}")]
    MarkRead {
        session: SessionRef,
        #[source]
        source: RepositoryError,
    },
}

/// What an open thread view currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ThreadSnapshot {
    pub state: ViewState,
    pub session: Option<SessionRef>,
    pub messages: Vec<ChatMessage>,
}

/// State of one open message thread.
///
/// Owned by exactly one view; nothing else mutates its message list.
#[derive(Debug)]
pub struct ThreadSync {
    pools: TenantPools,
    selected: Option<SessionRef>,
    messages: Vec<ChatMessage>,
    /// Message count the store reported on the last applied poll.
    last_count: usize,
    state: ViewState,
}

impl ThreadSync {
    #[must_use]
    pub fn new(pools: TenantPools) -> Self {
        Self {
            pools,
            selected: None,
            messages: Vec::new(),
            last_count: 0,
            state: ViewState::Closed,
        }
    }

    /// Switch the view to `session`.
    ///
    /// The known count drops to zero so the first poll of the new session
    /// always applies.
    pub fn select(&mut self, session: SessionRef) {
        self.selected = Some(session);
        self.messages.clear();
        self.last_count = 0;
        self.state = ViewState::Loading;
    }

    pub fn close(&mut self) {
        self.selected = None;
        self.messages.clear();
        self.last_count = 0;
        self.state = ViewState::Closed;
    }

    /// Append a message this view just sent, ahead of the next poll.
    ///
    /// The known count is left alone, so the next poll sees the store's
    /// higher count and replaces the list with the confirmed one. Returns
    /// `false` if `session` is not the selected one.
    pub fn record_sent(&mut self, session: SessionRef, message: ChatMessage) -> bool {
        if self.selected != Some(session) || message.session_id != session.session_id {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Fetch the selected thread and apply it if the count moved.
    ///
    /// # Errors
    ///
    /// Returns `ThreadSyncError` if the tenant has no store, or the fetch
    /// or read-state write fails. The view moves to `Error` and the next
    /// poll retries.
    #[instrument(skip(self), fields(session = ?self.selected))]
    pub async fn poll(&mut self) -> Result<PollOutcome, ThreadSyncError> {
        let Some(session) = self.selected else {
            return Ok(PollOutcome::Idle);
        };
        if matches!(self.state, ViewState::Error(_)) {
            self.state = ViewState::Loading;
        }

        let result = self.poll_selected(session).await;
        if let Err(ref e) = result {
            warn!(session = %session, error = %e, "Thread poll failed");
            self.state = ViewState::Error(e.to_string());
        }
        result
    }

    async fn poll_selected(&mut self, session: SessionRef) -> Result<PollOutcome, ThreadSyncError> {
        let store = Arc::clone(self.pools.store(session.tenant)?);
        let fetched = store
            .list_messages(session.session_id)
            .await
            .map_err(|source| ThreadSyncError::Fetch { session, source })?;

        if fetched.len() == self.last_count {
            self.state = ViewState::Synced;
            return Ok(PollOutcome::Unchanged);
        }

        let unread: Vec<ChatMessageId> = fetched
            .iter()
            .filter(|m| m.is_unread_client_message())
            .map(|m| m.id)
            .collect();
        self.messages = fetched;

        let marked_read = if unread.is_empty() {
            0
        } else {
            // Count is not advanced on failure, so the next poll retries the write.
            let marked = store
                .mark_read_by_admin(&unread)
                .await
                .map_err(|source| ThreadSyncError::MarkRead { session, source })?;
            for message in &mut self.messages {
                if unread.contains(&message.id) {
                    message.read_by_admin = true;
                }
            }
            marked
        };

        self.last_count = self.messages.len();
        self.state = ViewState::Synced;
        debug!(session = %session, count = self.last_count, marked_read, "Thread updated");
        Ok(PollOutcome::Updated { marked_read })
    }

    #[must_use]
    pub const fn selected(&self) -> Option<SessionRef> {
        self.selected
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub const fn last_count(&self) -> usize {
        self.last_count
    }

    #[must_use]
    pub const fn state(&self) -> &ViewState {
        &self.state
    }

    #[must_use]
    pub fn snapshot(&self) -> ThreadSnapshot {
        ThreadSnapshot {
            state: self.state.clone(),
            session: self.selected,
            messages: self.messages.clone(),
        }
    }
}
