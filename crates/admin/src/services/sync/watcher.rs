use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::{InboxSnapshot, InboxSync, ThreadSnapshot, ThreadSync};
use crate::models::{ChatMessage, SessionRef};

const COMMAND_BUFFER: usize = 16;

#[derive(Debug)]
enum ThreadCommand {
    Select(SessionRef),
    Close,
    RecordSent(SessionRef, ChatMessage),
    Resync,
}

/// Cloneable command side of a [`ThreadWatcher`].
///
/// Reports `false` from every command once the watcher has stopped.
#[derive(Debug, Clone)]
pub struct ThreadHandle {
    commands: mpsc::Sender<ThreadCommand>,
}

impl ThreadHandle {
    /// Switch to `session` and poll it immediately.
    pub async fn select(&self, session: SessionRef) -> bool {
        self.send(ThreadCommand::Select(session)).await
    }

    /// Close the thread and stop its timer until the next select.
    pub async fn close_thread(&self) -> bool {
        self.send(ThreadCommand::Close).await
    }

    /// Publish a just-sent message, then resync.
    pub async fn record_sent(&self, session: SessionRef, message: ChatMessage) -> bool {
        self.send(ThreadCommand::RecordSent(session, message)).await
    }

    /// Poll now instead of waiting for the next tick.
    ///
    /// Never waits: a full queue already holds a pending poll.
    pub fn resync(&self) -> bool {
        match self.commands.try_send(ThreadCommand::Resync) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Closed(_)) => false,
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn send(&self, command: ThreadCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }
}

/// Runs a [`ThreadSync`] on a fixed interval.
///
/// The timer only runs while a session is selected. The polling task is
/// aborted when the watcher is dropped.
#[derive(Debug)]
pub struct ThreadWatcher {
    handle: ThreadHandle,
    snapshots: watch::Receiver<ThreadSnapshot>,
    task: JoinHandle<()>,
}

impl ThreadWatcher {
    /// Start polling on the current tokio runtime.
    #[must_use]
    pub fn spawn(sync: ThreadSync, period: Duration) -> Self {
        let (snapshot_tx, snapshots) = watch::channel(sync.snapshot());
        let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let task = tokio::spawn(run_thread(sync, period, command_rx, snapshot_tx));
        Self {
            handle: ThreadHandle { commands },
            snapshots,
            task,
        }
    }

    /// Receiver that wakes whenever the published snapshot changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ThreadSnapshot> {
        self.snapshots.clone()
    }

    #[must_use]
    pub fn current(&self) -> ThreadSnapshot {
        self.snapshots.borrow().clone()
    }

    #[must_use]
    pub fn handle(&self) -> ThreadHandle {
        self.handle.clone()
    }

    pub async fn select(&self, session: SessionRef) -> bool {
        self.handle.select(session).await
    }

    pub async fn close_thread(&self) -> bool {
        self.handle.close_thread().await
    }

    pub async fn record_sent(&self, session: SessionRef, message: ChatMessage) -> bool {
        self.handle.record_sent(session, message).await
    }

    pub fn resync(&self) -> bool {
        self.handle.resync()
    }
}

impl Drop for ThreadWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_thread(
    mut sync: ThreadSync,
    period: Duration,
    mut commands: mpsc::Receiver<ThreadCommand>,
    snapshots: watch::Sender<ThreadSnapshot>,
) {
    let mut ticker = tokio::time::interval(period);
    // A stalled poll delays the next one instead of queueing a burst.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let command = tokio::select! {
            _ = ticker.tick(), if sync.selected().is_some() => None,
            command = commands.recv() => match command {
                Some(command) => Some(command),
                None => break,
            },
        };

        match command {
            Some(ThreadCommand::Select(session)) => {
                sync.select(session);
                publish(&snapshots, sync.snapshot());
                ticker.reset();
            }
            Some(ThreadCommand::Close) => {
                sync.close();
                publish(&snapshots, sync.snapshot());
                continue;
            }
            Some(ThreadCommand::RecordSent(session, message)) => {
                if sync.record_sent(session, message) {
                    publish(&snapshots, sync.snapshot());
                }
            }
            Some(ThreadCommand::Resync) | None => {}
        }

        // Failures are logged by the poll and surface as `ViewState::Error`.
        let _ = sync.poll().await;
        publish(&snapshots, sync.snapshot());

        if snapshots.is_closed() {
            break;
        }
    }
    debug!("Thread watcher stopped");
}

/// Cloneable resync side of an [`InboxWatcher`].
#[derive(Debug, Clone)]
pub struct InboxHandle {
    resync: mpsc::Sender<()>,
}

impl InboxHandle {
    /// Re-aggregate now, e.g. after a write. Never waits.
    pub fn resync(&self) -> bool {
        match self.resync.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => true,
            Err(TrySendError::Closed(())) => false,
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.resync.is_closed()
    }
}

/// Runs an [`InboxSync`] on a fixed interval.
///
/// The polling task is aborted when the watcher is dropped.
#[derive(Debug)]
pub struct InboxWatcher {
    handle: InboxHandle,
    snapshots: watch::Receiver<InboxSnapshot>,
    task: JoinHandle<()>,
}

impl InboxWatcher {
    /// Start polling on the current tokio runtime. The first poll runs at once.
    #[must_use]
    pub fn spawn(sync: InboxSync, period: Duration) -> Self {
        let (snapshot_tx, snapshots) = watch::channel(sync.snapshot());
        let (resync, resync_rx) = mpsc::channel(COMMAND_BUFFER);
        let task = tokio::spawn(run_inbox(sync, period, resync_rx, snapshot_tx));
        Self {
            handle: InboxHandle { resync },
            snapshots,
            task,
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<InboxSnapshot> {
        self.snapshots.clone()
    }

    #[must_use]
    pub fn current(&self) -> InboxSnapshot {
        self.snapshots.borrow().clone()
    }

    #[must_use]
    pub fn handle(&self) -> InboxHandle {
        self.handle.clone()
    }

    pub fn resync(&self) -> bool {
        self.handle.resync()
    }
}

impl Drop for InboxWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_inbox(
    mut sync: InboxSync,
    period: Duration,
    mut resync: mpsc::Receiver<()>,
    snapshots: watch::Sender<InboxSnapshot>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            request = resync.recv() => {
                if request.is_none() {
                    break;
                }
                ticker.reset();
            }
        }

        let _ = sync.poll().await;
        publish(&snapshots, sync.snapshot());

        if snapshots.is_closed() {
            break;
        }
    }
    debug!("Inbox watcher stopped");
}

/// Replace the published snapshot, waking receivers only on change.
fn publish<T: PartialEq>(snapshots: &watch::Sender<T>, next: T) {
    snapshots.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::{MemoryStore, SupportStore};
    use crate::services::sync::ViewState;
    use crate::models::StaffIdentity;
    use crate::services::inbox::InboxAggregator;
    use crate::tenancy::TenantPools;
    use bankdesk_core::{RoleFlags, TenantKey, UserId};
    use chrono::Utc;

    const PERIOD: Duration = Duration::from_secs(3);

    fn setup() -> (Arc<MemoryStore>, TenantPools) {
        let store = Arc::new(MemoryStore::new(TenantKey::Cayman));
        let pools = TenantPools::from_stores([Arc::clone(&store) as Arc<dyn SupportStore>]);
        (store, pools)
    }

    #[tokio::test(start_paused = true)]
    async fn test_thread_watcher_polls_until_dropped() {
        let (store, pools) = setup();
        let session = store
            .open_session(None, "Ana", None, Utc::now())
            .expect("open");
        store
            .post_client_message(session.id, "hello", Utc::now())
            .expect("post");

        let watcher = ThreadWatcher::spawn(ThreadSync::new(pools), PERIOD);
        let mut rx = watcher.subscribe();
        assert!(watcher.select(session.session_ref()).await);

        let synced = rx
            .wait_for(|s| s.state.is_synced())
            .await
            .expect("watcher running")
            .clone();
        assert_eq!(synced.messages.len(), 1);
        assert!(synced.messages[0].read_by_admin);

        store
            .post_client_message(session.id, "still there?", Utc::now())
            .expect("post");
        let updated = rx
            .wait_for(|s| s.messages.len() == 2)
            .await
            .expect("watcher running")
            .clone();
        assert!(updated.messages.iter().all(|m| m.read_by_admin));

        drop(rx);
        drop(watcher);
        let operations = store.operations();
        tokio::time::sleep(PERIOD * 10).await;
        assert_eq!(store.operations(), operations);
    }

    #[tokio::test(start_paused = true)]
    async fn test_thread_watcher_idle_tick_is_one_read() {
        let (store, pools) = setup();
        let session = store
            .open_session(None, "Ana", None, Utc::now())
            .expect("open");
        store
            .post_client_message(session.id, "hello", Utc::now())
            .expect("post");

        let watcher = ThreadWatcher::spawn(ThreadSync::new(pools), PERIOD);
        let mut rx = watcher.subscribe();
        watcher.select(session.session_ref()).await;
        rx.wait_for(|s| s.state.is_synced())
            .await
            .expect("watcher running");

        let before = store.operations();
        tokio::time::sleep(PERIOD + Duration::from_millis(100)).await;
        assert_eq!(store.operations(), before + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_thread_stops_polling_until_reselected() {
        let (store, pools) = setup();
        let session = store
            .open_session(None, "Ana", None, Utc::now())
            .expect("open");

        let watcher = ThreadWatcher::spawn(ThreadSync::new(pools), PERIOD);
        let mut rx = watcher.subscribe();
        watcher.select(session.session_ref()).await;
        rx.wait_for(|s| s.state.is_synced())
            .await
            .expect("watcher running");

        assert!(watcher.close_thread().await);
        rx.wait_for(|s| s.state == ViewState::Closed)
            .await
            .expect("watcher running");
        let closed = store.operations();
        tokio::time::sleep(PERIOD * 10).await;
        assert_eq!(store.operations(), closed);

        // Still alive: a new selection polls at once and resumes the timer
        assert!(watcher.select(session.session_ref()).await);
        rx.wait_for(|s| s.state.is_synced())
            .await
            .expect("watcher running");
        let reopened = store.operations();
        assert!(reopened > closed);
        tokio::time::sleep(PERIOD + Duration::from_millis(100)).await;
        assert_eq!(store.operations(), reopened + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resync_polls_without_waiting_for_tick() {
        let (store, pools) = setup();
        let session = store
            .open_session(None, "Ana", None, Utc::now())
            .expect("open");

        let watcher = ThreadWatcher::spawn(ThreadSync::new(pools), PERIOD);
        let mut rx = watcher.subscribe();
        watcher.select(session.session_ref()).await;
        rx.wait_for(|s| s.state.is_synced())
            .await
            .expect("watcher running");

        store
            .post_client_message(session.id, "hello", Utc::now())
            .expect("post");
        assert!(watcher.resync());
        tokio::time::timeout(PERIOD / 2, rx.wait_for(|s| s.messages.len() == 1))
            .await
            .expect("before the next tick")
            .expect("watcher running");
    }

    #[tokio::test(start_paused = true)]
    async fn test_inbox_watcher_picks_up_new_sessions() {
        let (store, pools) = setup();
        let staff = StaffIdentity {
            id: UserId::new(1),
            tenant: TenantKey::Cayman,
            roles: RoleFlags {
                is_admin: true,
                ..RoleFlags::default()
            },
        };

        let watcher = InboxWatcher::spawn(
            InboxSync::new(InboxAggregator::new(pools), staff),
            PERIOD,
        );
        let mut rx = watcher.subscribe();
        rx.wait_for(|s| s.state.is_synced())
            .await
            .expect("watcher running");
        assert!(watcher.current().sessions.is_empty());

        store
            .open_session(None, "Ana", None, Utc::now())
            .expect("open");
        let snapshot = rx
            .wait_for(|s| s.sessions.len() == 1)
            .await
            .expect("watcher running")
            .clone();
        assert_eq!(snapshot.sessions[0].session.client_name, "Ana");

        drop(rx);
        drop(watcher);
        let operations = store.operations();
        tokio::time::sleep(PERIOD * 10).await;
        assert_eq!(store.operations(), operations);
    }
}
