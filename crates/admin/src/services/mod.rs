//! Business logic services for the support desk.
//!
//! # Services
//!
//! - `inbox` - Cross-tenant session aggregation with unread counts
//! - `sync` - Polling synchronization of the inbox and open threads
//! - `gateway` - Send, close, and delete operations on sessions
//! - `hierarchy` - Administration of manager hierarchy edges

pub mod gateway;
pub mod hierarchy;
pub mod inbox;
pub mod sync;

pub use gateway::{BulkDeleteReport, GatewayError, MutationGateway, SendFailure};
pub use hierarchy::{HierarchyAdmin, HierarchyAdminError};
pub use inbox::{AggregatedInbox, FailureKind, InboxAggregator, InboxError, PartialFailure};
pub use sync::{
    InboxHandle, InboxSnapshot, InboxSync, InboxWatcher, OpenViews, PollOutcome, SyncConfig,
    ThreadHandle, ThreadSnapshot, ThreadSync, ThreadSyncError, ThreadWatcher, ViewState,
};
