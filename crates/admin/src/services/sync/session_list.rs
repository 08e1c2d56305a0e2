use serde::Serialize;
use tracing::error;

use super::ViewState;
use crate::models::{AggregatedSession, StaffIdentity};
use crate::services::inbox::{AggregatedInbox, InboxAggregator, InboxError, PartialFailure};

/// What an open session list currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct InboxSnapshot {
    pub state: ViewState,
    pub sessions: Vec<AggregatedSession>,
    pub partial_failures: Vec<PartialFailure>,
}

/// State of one open session list.
///
/// Every poll replaces the whole list; there is no incremental diff.
#[derive(Debug)]
pub struct InboxSync {
    aggregator: InboxAggregator,
    staff: StaffIdentity,
    inbox: AggregatedInbox,
    state: ViewState,
}

impl InboxSync {
    #[must_use]
    pub fn new(aggregator: InboxAggregator, staff: StaffIdentity) -> Self {
        Self {
            aggregator,
            staff,
            inbox: AggregatedInbox::default(),
            state: ViewState::Loading,
        }
    }

    /// Re-aggregate and replace the list.
    ///
    /// On total failure the previous list stays visible and the view moves
    /// to `Error`.
    ///
    /// # Errors
    ///
    /// Returns `InboxError::AllTenantsFailed` if no tenant could be read.
    pub async fn poll(&mut self) -> Result<&AggregatedInbox, InboxError> {
        if matches!(self.state, ViewState::Error(_)) {
            self.state = ViewState::Loading;
        }

        match self.aggregator.aggregate(&self.staff).await {
            Ok(inbox) => {
                self.inbox = inbox;
                self.state = ViewState::Synced;
                Ok(&self.inbox)
            }
            Err(e) => {
                error!(staff_id = %self.staff.id, error = %e, "Inbox poll failed");
                self.state = ViewState::Error(e.to_string());
                Err(e)
            }
        }
    }

    #[must_use]
    pub const fn inbox(&self) -> &AggregatedInbox {
        &self.inbox
    }

    #[must_use]
    pub const fn state(&self) -> &ViewState {
        &self.state
    }

    #[must_use]
    pub fn snapshot(&self) -> InboxSnapshot {
        InboxSnapshot {
            state: self.state.clone(),
            sessions: self.inbox.sessions.clone(),
            partial_failures: self.inbox.partial_failures.clone(),
        }
    }
}
