//! Registry of the live views the desk is currently streaming.
//!
//! Writes go through the gateway and then notify this registry, so an open
//! thread shows a sent message at once and every open inbox re-aggregates
//! without waiting for its next tick.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use super::{InboxHandle, ThreadHandle};
use crate::models::{ChatMessage, SessionRef};

/// Thread views by session, plus every open inbox.
///
/// Handles of stopped watchers are pruned whenever the registry is touched.
#[derive(Debug, Default)]
pub struct OpenViews {
    threads: RwLock<HashMap<SessionRef, Vec<ThreadHandle>>>,
    inboxes: RwLock<Vec<InboxHandle>>,
}

impl OpenViews {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn watch_thread(&self, session: SessionRef, handle: ThreadHandle) {
        let mut threads = self.threads.write().await;
        threads.retain(|_, handles| {
            handles.retain(|h| !h.is_closed());
            !handles.is_empty()
        });
        threads.entry(session).or_default().push(handle);
    }

    pub async fn watch_inbox(&self, handle: InboxHandle) {
        let mut inboxes = self.inboxes.write().await;
        inboxes.retain(|h| !h.is_closed());
        inboxes.push(handle);
    }

    /// Show a just-sent staff message in every view of its session.
    pub async fn message_sent(&self, session: SessionRef, message: &ChatMessage) {
        for handle in self.threads_of(session).await {
            handle.record_sent(session, message.clone()).await;
        }
        self.resync_inboxes().await;
    }

    /// Resync views after `sessions` were closed or deleted.
    ///
    /// Any write can change what an inbox lists, so every open inbox
    /// re-aggregates, whoever it belongs to.
    pub async fn sessions_changed(&self, sessions: &[SessionRef]) {
        for session in sessions {
            for handle in self.threads_of(*session).await {
                handle.resync();
            }
        }
        self.resync_inboxes().await;
    }

    /// Number of live thread views of `session`.
    pub async fn thread_count(&self, session: SessionRef) -> usize {
        self.threads_of(session).await.len()
    }

    pub async fn inbox_count(&self) -> usize {
        self.inboxes
            .read()
            .await
            .iter()
            .filter(|h| !h.is_closed())
            .count()
    }

    async fn threads_of(&self, session: SessionRef) -> Vec<ThreadHandle> {
        self.threads
            .read()
            .await
            .get(&session)
            .map(|handles| {
                handles
                    .iter()
                    .filter(|h| !h.is_closed())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn resync_inboxes(&self) {
        let inboxes = self.inboxes.read().await;
        let woken = inboxes.iter().filter(|h| h.resync()).count();
        debug!(woken, "Resynced open inboxes");
    }
}
