//! Hierarchy-based access resolution.
//!
//! Resolution runs against a single tenant's edge table and is never
//! cached: edges can change between two calls.

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use bankdesk_core::{RelationKind, TenantKey, UserId};

use crate::db::{RepositoryError, SupportStore};
use crate::models::StaffIdentity;

/// The end users whose sessions a staff member may see in one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "user_ids", rename_all = "snake_case")]
pub enum AccessSet {
    /// Every session of the tenant.
    Unrestricted,
    /// Only sessions whose client is in the set. May be empty.
    Restricted(BTreeSet<UserId>),
}

impl AccessSet {
    #[must_use]
    pub const fn none() -> Self {
        Self::Restricted(BTreeSet::new())
    }

    /// True for a restricted set with no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Restricted(ids) if ids.is_empty())
    }

    /// Whether a session opened by `client` is visible.
    ///
    /// Anonymous sessions are visible only to unrestricted staff.
    #[must_use]
    pub fn permits(&self, client: Option<UserId>) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::Restricted(ids) => client.is_some_and(|id| ids.contains(&id)),
        }
    }
}

/// Edge lookup failed. Callers must treat this as no access.
#[derive(Debug, Error)]
#[error("access resolution failed for tenant {tenant}: {source}")]
pub struct ResolutionError {
    pub tenant: TenantKey,
    #[source]
    pub source: RepositoryError,
}

/// Compute `staff`'s access set within the tenant `store` belongs to.
///
/// - Pure admin: unrestricted, no query issued.
/// - Manager: subordinates of the staff member's `manager_to_user` edges.
/// - Superior manager: users under every manager reached through the
///   staff member's `superior_manager_to_manager` edges, plus the staff
///   member's own `manager_to_user` edges. The managers themselves are
///   not included.
/// - No flags: empty set, no query issued.
///
/// # Errors
///
/// Returns `ResolutionError` if the store fails. No partial set is
/// returned in that case.
#[instrument(skip_all, fields(tenant = %store.tenant(), staff_id = %staff.id))]
pub async fn resolve_access(
    staff: &StaffIdentity,
    store: &dyn SupportStore,
) -> Result<AccessSet, ResolutionError> {
    let roles = staff.roles;
    if roles.is_pure_admin() {
        return Ok(AccessSet::Unrestricted);
    }

    let fail = |source| ResolutionError {
        tenant: store.tenant(),
        source,
    };

    let mut owners = vec![staff.id];
    if roles.is_superior_manager {
        let managed = store
            .edges_from(staff.id, RelationKind::SuperiorManagerToManager)
            .await
            .map_err(fail)?;
        owners.extend(managed.into_iter().map(|e| e.subordinate_id));
    } else if !roles.is_manager {
        return Ok(AccessSet::none());
    }

    let users = store
        .edges_from_any(&owners, RelationKind::ManagerToUser)
        .await
        .map_err(fail)?;

    Ok(AccessSet::Restricted(
        users.into_iter().map(|e| e.subordinate_id).collect(),
    ))
}
