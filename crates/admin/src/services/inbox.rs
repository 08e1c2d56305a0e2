//! Cross-tenant support inbox aggregation.
//!
//! One pass resolves access in every tenant, fetches the visible sessions,
//! attaches unread counts, and merges everything into a single ordered
//! list. A tenant that fails is skipped and reported; the pass only fails
//! outright when every tenant does.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, instrument, warn};

use bankdesk_core::{TenantKey, UserId};

use crate::access::{AccessSet, resolve_access};
use crate::db::{RepositoryError, SupportStore};
use crate::models::{AggregatedSession, StaffIdentity};
use crate::tenancy::{TenantPools, TenantRegistry};

/// Why a tenant is missing from an aggregated inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Hierarchy lookup failed; the tenant was treated as no access.
    Resolution,
    /// Sessions or unread counts could not be fetched.
    Unreachable,
}

/// A tenant skipped during aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialFailure {
    pub tenant: TenantKey,
    pub kind: FailureKind,
    pub message: String,
}

impl PartialFailure {
    fn unreachable(tenant: TenantKey, err: &RepositoryError) -> Self {
        Self {
            tenant,
            kind: FailureKind::Unreachable,
            message: err.to_string(),
        }
    }
}

/// Result of one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregatedInbox {
    /// Visible sessions, newest activity first.
    pub sessions: Vec<AggregatedSession>,
    /// Tenants that were skipped.
    pub partial_failures: Vec<PartialFailure>,
}

impl AggregatedInbox {
    /// Keys of the tenants that were skipped.
    #[must_use]
    pub fn failed_tenants(&self) -> Vec<TenantKey> {
        self.partial_failures.iter().map(|f| f.tenant).collect()
    }

    /// Total unread client messages across all sessions.
    #[must_use]
    pub fn unread_total(&self) -> u64 {
        self.sessions.iter().map(|s| s.unread_count).sum()
    }
}

/// Errors that make an aggregation pass fail as a whole.
#[derive(Debug, Error)]
pub enum InboxError {
    #[error("every tenant failed ({} failures)", .0.len())]
    AllTenantsFailed(Vec<PartialFailure>),
}

/// Fans inbox queries out over every configured tenant.
#[derive(Debug, Clone)]
pub struct InboxAggregator {
    pools: TenantPools,
}

impl InboxAggregator {
    #[must_use]
    pub const fn new(pools: TenantPools) -> Self {
        Self { pools }
    }

    /// Build the inbox `staff` may see across all tenants.
    ///
    /// Each tenant re-evaluates the same staff ID and role flags against its
    /// own edge table. Tenants are queried concurrently on the calling task;
    /// the merged list is sorted only after every tenant has answered.
    ///
    /// # Errors
    ///
    /// Returns `InboxError::AllTenantsFailed` if no configured tenant could
    /// be aggregated.
    #[instrument(skip_all, fields(staff_id = %staff.id))]
    pub async fn aggregate(&self, staff: &StaffIdentity) -> Result<AggregatedInbox, InboxError> {
        let passes = self
            .pools
            .iter()
            .map(|(key, store)| collect_tenant(staff, key, Arc::clone(store)));
        let results = futures::future::join_all(passes).await;

        let mut inbox = AggregatedInbox::default();
        for result in results {
            match result {
                Ok(sessions) => inbox.sessions.extend(sessions),
                Err(failure) => {
                    warn!(
                        tenant = %failure.tenant,
                        kind = ?failure.kind,
                        error = %failure.message,
                        "Skipping tenant in support inbox"
                    );
                    inbox.partial_failures.push(failure);
                }
            }
        }

        if !inbox.partial_failures.is_empty() && inbox.partial_failures.len() == self.pools.len() {
            error!(
                failures = inbox.partial_failures.len(),
                "Support inbox failed for every tenant"
            );
            return Err(InboxError::AllTenantsFailed(inbox.partial_failures));
        }

        sort_sessions(&mut inbox.sessions);
        Ok(inbox)
    }
}

/// Resolve, fetch, and count unread for one tenant.
async fn collect_tenant(
    staff: &StaffIdentity,
    key: TenantKey,
    store: Arc<dyn SupportStore>,
) -> Result<Vec<AggregatedSession>, PartialFailure> {
    let access = resolve_access(staff, store.as_ref())
        .await
        .map_err(|e| PartialFailure {
            tenant: key,
            kind: FailureKind::Resolution,
            message: e.to_string(),
        })?;

    let sessions = match access {
        AccessSet::Unrestricted => store.list_sessions().await,
        AccessSet::Restricted(ids) if ids.is_empty() => return Ok(Vec::new()),
        AccessSet::Restricted(ids) => {
            let ids: Vec<UserId> = ids.into_iter().collect();
            store.list_sessions_for_clients(&ids).await
        }
    }
    .map_err(|e| PartialFailure::unreachable(key, &e))?;

    let tenant_display_name = TenantRegistry::display_name(key);
    let mut aggregated = Vec::with_capacity(sessions.len());
    for session in sessions {
        // One count per session; support-desk volumes keep this small.
        let unread_count = store
            .count_unread_client_messages(session.id)
            .await
            .map_err(|e| PartialFailure::unreachable(key, &e))?;
        aggregated.push(AggregatedSession {
            session,
            tenant_display_name,
            unread_count,
        });
    }
    Ok(aggregated)
}

/// Newest activity first; ties by session ID ascending, then tenant.
pub fn sort_sessions(sessions: &mut [AggregatedSession]) {
    sessions.sort_by(compare_sessions);
}

fn compare_sessions(a: &AggregatedSession, b: &AggregatedSession) -> Ordering {
    b.session
        .last_message_at
        .cmp(&a.session.last_message_at)
        .then_with(|| a.session.id.cmp(&b.session.id))
        .then_with(|| a.session.tenant.cmp(&b.session.tenant))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::NewHierarchyEdge;
    use bankdesk_core::{RelationKind, RoleFlags};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, minute, 0)
            .single()
            .expect("valid timestamp")
    }

    fn admin() -> StaffIdentity {
        StaffIdentity {
            id: UserId::new(1_000),
            tenant: TenantKey::Cayman,
            roles: RoleFlags {
                is_admin: true,
                ..RoleFlags::default()
            },
        }
    }

    fn stores() -> [Arc<MemoryStore>; 3] {
        TenantKey::ALL.map(|k| Arc::new(MemoryStore::new(k)))
    }

    fn pools(stores: &[Arc<MemoryStore>]) -> TenantPools {
        TenantPools::from_stores(
            stores
                .iter()
                .map(|s| Arc::clone(s) as Arc<dyn SupportStore>),
        )
    }

    #[tokio::test]
    async fn test_admin_sees_all_sorted_by_activity() {
        let stores = stores();
        let [cayman, bahamas, bermuda] = &stores;
        cayman.open_session(None, "A", None, at(5)).expect("open");
        bahamas.open_session(None, "B", None, at(9)).expect("open");
        bermuda.open_session(None, "C", None, at(1)).expect("open");

        let inbox = InboxAggregator::new(pools(&stores))
            .aggregate(&admin())
            .await
            .expect("aggregate");

        let names: Vec<_> = inbox
            .sessions
            .iter()
            .map(|s| s.session.client_name.as_str())
            .collect();
        assert_eq!(names, ["B", "A", "C"]);
        assert_eq!(inbox.sessions[0].tenant_display_name, "Bahamas Trust");
        assert!(inbox.partial_failures.is_empty());
    }

    #[tokio::test]
    async fn test_ties_broken_by_session_id() {
        let stores = stores();
        let [cayman, _, bermuda] = &stores;
        // Both stores start their sequences at 1, so IDs collide across tenants.
        let first = cayman.open_session(None, "A", None, at(3)).expect("open");
        let second = cayman.open_session(None, "B", None, at(3)).expect("open");
        bermuda.open_session(None, "C", None, at(3)).expect("open");

        let aggregator = InboxAggregator::new(pools(&stores));
        let inbox = aggregator.aggregate(&admin()).await.expect("aggregate");
        let order: Vec<_> = inbox
            .sessions
            .iter()
            .map(|s| (s.session.id, s.session.tenant))
            .collect();
        assert_eq!(
            order,
            [
                (first.id, TenantKey::Cayman),
                (first.id, TenantKey::Bermuda),
                (second.id, TenantKey::Cayman),
            ]
        );

        let again = aggregator.aggregate(&admin()).await.expect("aggregate");
        assert_eq!(again, inbox);
    }

    #[tokio::test]
    async fn test_unread_counts_only_client_messages() {
        let stores = stores();
        let cayman = &stores[0];
        let session = cayman.open_session(None, "A", None, at(0)).expect("open");
        cayman
            .post_client_message(session.id, "one", at(1))
            .expect("post");
        cayman
            .post_client_message(session.id, "two", at(2))
            .expect("post");
        cayman
            .insert_message(&crate::models::NewChatMessage::staff_reply(
                session.id, "Support", "hi",
            ))
            .await
            .expect("reply");

        let inbox = InboxAggregator::new(pools(&stores))
            .aggregate(&admin())
            .await
            .expect("aggregate");
        assert_eq!(inbox.sessions.len(), 1);
        assert_eq!(inbox.sessions[0].unread_count, 2);
        assert_eq!(inbox.unread_total(), 2);
    }

    #[tokio::test]
    async fn test_one_unreachable_tenant_is_partial() {
        let stores = stores();
        let [cayman, bahamas, bermuda] = &stores;
        cayman.open_session(None, "A", None, at(1)).expect("open");
        bermuda.open_session(None, "C", None, at(2)).expect("open");
        bahamas.set_offline(true);

        let inbox = InboxAggregator::new(pools(&stores))
            .aggregate(&admin())
            .await
            .expect("partial result");
        assert_eq!(inbox.sessions.len(), 2);
        assert_eq!(inbox.failed_tenants(), [TenantKey::Bahamas]);
        assert_eq!(inbox.partial_failures[0].kind, FailureKind::Unreachable);
    }

    #[tokio::test]
    async fn test_resolution_failure_is_reported_as_such() {
        let stores = stores();
        stores[2].set_offline(true);
        let manager = StaffIdentity {
            id: UserId::new(7),
            tenant: TenantKey::Cayman,
            roles: RoleFlags {
                is_manager: true,
                ..RoleFlags::default()
            },
        };

        let inbox = InboxAggregator::new(pools(&stores))
            .aggregate(&manager)
            .await
            .expect("partial result");
        assert_eq!(inbox.partial_failures.len(), 1);
        assert_eq!(inbox.partial_failures[0].tenant, TenantKey::Bermuda);
        assert_eq!(inbox.partial_failures[0].kind, FailureKind::Resolution);
    }

    #[tokio::test]
    async fn test_all_tenants_failing_is_fatal() {
        let stores = stores();
        for store in &stores {
            store.set_offline(true);
        }

        let err = InboxAggregator::new(pools(&stores))
            .aggregate(&admin())
            .await
            .unwrap_err();
        let InboxError::AllTenantsFailed(failures) = err;
        assert_eq!(failures.len(), 3);
    }

    #[tokio::test]
    async fn test_restricted_staff_only_sees_subordinates() {
        let stores = stores();
        let cayman = &stores[0];
        let mine = cayman.add_user("Mine", None, RoleFlags::default()).expect("user");
        let other = cayman.add_user("Other", None, RoleFlags::default()).expect("user");
        let manager = cayman
            .add_user(
                "Manager",
                None,
                RoleFlags {
                    is_manager: true,
                    ..RoleFlags::default()
                },
            )
            .expect("user");
        cayman
            .insert_edge(&NewHierarchyEdge {
                superior_id: manager.id,
                subordinate_id: mine.id,
                kind: RelationKind::ManagerToUser,
            })
            .await
            .expect("edge");
        cayman
            .open_session(Some(mine.id), "Mine", None, at(1))
            .expect("open");
        cayman
            .open_session(Some(other.id), "Other", None, at(2))
            .expect("open");
        cayman.open_session(None, "Anon", None, at(3)).expect("open");

        let inbox = InboxAggregator::new(pools(&stores))
            .aggregate(&manager.as_staff())
            .await
            .expect("aggregate");
        assert_eq!(inbox.sessions.len(), 1);
        assert_eq!(inbox.sessions[0].session.client_user_id, Some(mine.id));
    }

    #[tokio::test]
    async fn test_no_role_issues_no_session_queries() {
        let stores = stores();
        stores[0].open_session(None, "A", None, at(1)).expect("open");
        let nobody = StaffIdentity {
            id: UserId::new(3),
            tenant: TenantKey::Cayman,
            roles: RoleFlags::default(),
        };

        let inbox = InboxAggregator::new(pools(&stores))
            .aggregate(&nobody)
            .await
            .expect("aggregate");
        assert!(inbox.sessions.is_empty());
        assert!(stores.iter().all(|s| s.operations() == 0));
    }
}
