//! Polling-based synchronization of the support inbox and open threads.
//!
//! There is no push transport across tenants, so both views poll:
//!
//! - The session list re-runs the aggregator every tick and replaces its
//!   in-memory list.
//! - An open thread re-fetches its messages every tick but only replaces
//!   them, and marks client messages read, when the message count moved.
//!
//! [`ThreadSync`] and [`InboxSync`] hold the state and are driven directly
//! in tests. [`ThreadWatcher`] and [`InboxWatcher`] run them on a tokio
//! interval and publish snapshots; dropping a watcher stops its timer.
//! [`OpenViews`] tracks the running watchers so a write can resync them.

mod session_list;
mod thread;
mod views;
mod watcher;

use std::time::Duration;

use serde::Serialize;

use crate::config::SupportConfig;

pub use session_list::{InboxSnapshot, InboxSync};
pub use thread::{PollOutcome, ThreadSnapshot, ThreadSync, ThreadSyncError};
pub use views::OpenViews;
pub use watcher::{InboxHandle, InboxWatcher, ThreadHandle, ThreadWatcher};

/// Polling intervals for the two views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub inbox_interval: Duration,
    pub thread_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            inbox_interval: Duration::from_secs(3),
            thread_interval: Duration::from_secs(3),
        }
    }
}

impl From<&SupportConfig> for SyncConfig {
    fn from(config: &SupportConfig) -> Self {
        Self {
            inbox_interval: config.inbox_poll_interval,
            thread_interval: config.thread_poll_interval,
        }
    }
}

/// Lifecycle of one view.
///
/// `Closed -> Loading -> Synced`, re-entering `Synced` on every poll. A
/// failed poll moves to `Error`; the next tick retries through `Loading`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum ViewState {
    #[default]
    Closed,
    Loading,
    Synced,
    Error(String),
}

impl ViewState {
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        matches!(self, Self::Synced)
    }
}
