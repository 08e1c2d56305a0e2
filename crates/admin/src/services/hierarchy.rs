//! Manager hierarchy administration.
//!
//! Edges are created and deleted by administrators; there is no update.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use bankdesk_core::{HierarchyEdgeId, RelationKind, TenantKey, UserId};

use crate::db::{RepositoryError, SupportStore};
use crate::models::{HierarchyEdge, NewHierarchyEdge, UserRecord};
use crate::tenancy::{RegistryError, TenantPools};

/// Most candidates returned by one search.
pub const CANDIDATE_LIMIT: i64 = 20;

#[derive(Debug, Error)]
pub enum HierarchyAdminError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("a user cannot supervise themselves")]
    SelfEdge,

    #[error("user {user} is not a {role}")]
    MissingRole { user: UserId, role: &'static str },

    #[error("hierarchy edge already exists")]
    Duplicate,

    #[error("hierarchy edge {0} not found")]
    EdgeNotFound(HierarchyEdgeId),

    #[error("store error: {0}")]
    Store(RepositoryError),
}

impl From<RepositoryError> for HierarchyAdminError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(_) => Self::Duplicate,
            other => Self::Store(other),
        }
    }
}

/// Creates, removes, and lists hierarchy edges in one tenant at a time.
#[derive(Debug, Clone)]
pub struct HierarchyAdmin {
    pools: TenantPools,
}

impl HierarchyAdmin {
    #[must_use]
    pub const fn new(pools: TenantPools) -> Self {
        Self { pools }
    }

    fn store(&self, tenant: TenantKey) -> Result<Arc<dyn SupportStore>, HierarchyAdminError> {
        Ok(Arc::clone(self.pools.store(tenant)?))
    }

    /// Add a supervision edge.
    ///
    /// The superior must hold the role matching `kind`; a
    /// `SuperiorManagerToManager` subordinate must be a manager.
    ///
    /// # Errors
    ///
    /// Returns `HierarchyAdminError` for self-edges, unknown users, missing
    /// roles, duplicates, or store failures.
    #[instrument(skip(self), fields(tenant = %tenant))]
    pub async fn assign(
        &self,
        tenant: TenantKey,
        edge: NewHierarchyEdge,
    ) -> Result<HierarchyEdge, HierarchyAdminError> {
        if edge.superior_id == edge.subordinate_id {
            return Err(HierarchyAdminError::SelfEdge);
        }

        let store = self.store(tenant)?;
        let superior = require_user(store.as_ref(), edge.superior_id).await?;
        let subordinate = require_user(store.as_ref(), edge.subordinate_id).await?;

        match edge.kind {
            RelationKind::ManagerToUser => {
                if !superior.roles.is_manager && !superior.roles.is_superior_manager {
                    return Err(HierarchyAdminError::MissingRole {
                        user: superior.id,
                        role: "manager",
                    });
                }
            }
            RelationKind::SuperiorManagerToManager => {
                if !superior.roles.is_superior_manager {
                    return Err(HierarchyAdminError::MissingRole {
                        user: superior.id,
                        role: "superior manager",
                    });
                }
                if !subordinate.roles.is_manager {
                    return Err(HierarchyAdminError::MissingRole {
                        user: subordinate.id,
                        role: "manager",
                    });
                }
            }
        }

        let created = store.insert_edge(&edge).await?;
        info!(
            tenant = %tenant,
            edge_id = %created.id,
            superior_id = %created.superior_id,
            subordinate_id = %created.subordinate_id,
            kind = %created.kind,
            "Hierarchy edge created"
        );
        Ok(created)
    }

    /// Remove a supervision edge.
    ///
    /// # Errors
    ///
    /// Returns `HierarchyAdminError::EdgeNotFound` if no such edge exists.
    #[instrument(skip(self), fields(tenant = %tenant))]
    pub async fn unassign(
        &self,
        tenant: TenantKey,
        edge_id: HierarchyEdgeId,
    ) -> Result<(), HierarchyAdminError> {
        if !self.store(tenant)?.delete_edge(edge_id).await? {
            return Err(HierarchyAdminError::EdgeNotFound(edge_id));
        }
        info!(tenant = %tenant, edge_id = %edge_id, "Hierarchy edge removed");
        Ok(())
    }

    /// Edges owned by `superior_id`, of either kind.
    ///
    /// # Errors
    ///
    /// Returns `HierarchyAdminError` if the store fails.
    pub async fn list(
        &self,
        tenant: TenantKey,
        superior_id: UserId,
    ) -> Result<Vec<HierarchyEdge>, HierarchyAdminError> {
        Ok(self.store(tenant)?.list_edges(superior_id).await?)
    }

    /// Users matching `query` by name or email, for picking an edge endpoint.
    ///
    /// # Errors
    ///
    /// Returns `HierarchyAdminError` if the store fails.
    pub async fn search_candidates(
        &self,
        tenant: TenantKey,
        query: &str,
    ) -> Result<Vec<UserRecord>, HierarchyAdminError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .store(tenant)?
            .search_users(query, CANDIDATE_LIMIT)
            .await?)
    }
}

async fn require_user(
    store: &dyn SupportStore,
    id: UserId,
) -> Result<UserRecord, HierarchyAdminError> {
    store
        .get_user(id)
        .await?
        .ok_or(HierarchyAdminError::UserNotFound(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use bankdesk_core::RoleFlags;

    struct Fixture {
        store: Arc<MemoryStore>,
        admin: HierarchyAdmin,
        superior: UserRecord,
        manager: UserRecord,
        client: UserRecord,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new(TenantKey::Bahamas));
        let superior = store
            .add_user(
                "Sofia Superior",
                Some("sofia@bahamas.example"),
                RoleFlags {
                    is_superior_manager: true,
                    ..RoleFlags::default()
                },
            )
            .expect("user");
        let manager = store
            .add_user(
                "Marco Manager",
                Some("marco@bahamas.example"),
                RoleFlags {
                    is_manager: true,
                    ..RoleFlags::default()
                },
            )
            .expect("user");
        let client = store
            .add_user("Carla Client", None, RoleFlags::default())
            .expect("user");
        let pools = TenantPools::from_stores([Arc::clone(&store) as Arc<dyn SupportStore>]);
        Fixture {
            store,
            admin: HierarchyAdmin::new(pools),
            superior,
            manager,
            client,
        }
    }

    fn edge(superior: &UserRecord, subordinate: &UserRecord, kind: RelationKind) -> NewHierarchyEdge {
        NewHierarchyEdge {
            superior_id: superior.id,
            subordinate_id: subordinate.id,
            kind,
        }
    }

    #[tokio::test]
    async fn test_assign_and_list() {
        let f = fixture();
        let created = f
            .admin
            .assign(
                TenantKey::Bahamas,
                edge(&f.manager, &f.client, RelationKind::ManagerToUser),
            )
            .await
            .expect("assign");
        assert_eq!(created.tenant, TenantKey::Bahamas);

        let edges = f
            .admin
            .list(TenantKey::Bahamas, f.manager.id)
            .await
            .expect("list");
        assert_eq!(edges, vec![created]);
    }

    #[tokio::test]
    async fn test_assign_rejects_duplicate() {
        let f = fixture();
        let new = edge(&f.manager, &f.client, RelationKind::ManagerToUser);
        f.admin
            .assign(TenantKey::Bahamas, new)
            .await
            .expect("assign");
        let err = f.admin.assign(TenantKey::Bahamas, new).await.unwrap_err();
        assert!(matches!(err, HierarchyAdminError::Duplicate));
    }

    #[tokio::test]
    async fn test_assign_rejects_self_edge() {
        let f = fixture();
        let err = f
            .admin
            .assign(
                TenantKey::Bahamas,
                edge(&f.manager, &f.manager, RelationKind::ManagerToUser),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, HierarchyAdminError::SelfEdge));
        assert_eq!(f.store.operations(), 0);
    }

    #[tokio::test]
    async fn test_assign_checks_roles() {
        let f = fixture();
        let err = f
            .admin
            .assign(
                TenantKey::Bahamas,
                edge(&f.client, &f.manager, RelationKind::ManagerToUser),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, HierarchyAdminError::MissingRole { role: "manager", .. }));

        let err = f
            .admin
            .assign(
                TenantKey::Bahamas,
                edge(&f.superior, &f.client, RelationKind::SuperiorManagerToManager),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HierarchyAdminError::MissingRole { user, .. } if user == f.client.id
        ));

        f.admin
            .assign(
                TenantKey::Bahamas,
                edge(&f.superior, &f.manager, RelationKind::SuperiorManagerToManager),
            )
            .await
            .expect("superior to manager");
    }

    #[tokio::test]
    async fn test_assign_unknown_user() {
        let f = fixture();
        let err = f
            .admin
            .assign(
                TenantKey::Bahamas,
                NewHierarchyEdge {
                    superior_id: f.manager.id,
                    subordinate_id: UserId::new(9_999),
                    kind: RelationKind::ManagerToUser,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, HierarchyAdminError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn test_unassign() {
        let f = fixture();
        let created = f
            .admin
            .assign(
                TenantKey::Bahamas,
                edge(&f.manager, &f.client, RelationKind::ManagerToUser),
            )
            .await
            .expect("assign");

        f.admin
            .unassign(TenantKey::Bahamas, created.id)
            .await
            .expect("unassign");
        let err = f
            .admin
            .unassign(TenantKey::Bahamas, created.id)
            .await
            .unwrap_err();
        assert!(matches!(err, HierarchyAdminError::EdgeNotFound(_)));
    }

    #[tokio::test]
    async fn test_search_candidates() {
        let f = fixture();
        assert!(
            f.admin
                .search_candidates(TenantKey::Bahamas, "   ")
                .await
                .expect("search")
                .is_empty()
        );
        assert_eq!(f.store.operations(), 0);

        let found = f
            .admin
            .search_candidates(TenantKey::Bahamas, " marco ")
            .await
            .expect("search");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, f.manager.id);
    }

    #[tokio::test]
    async fn test_search_candidates_is_capped() {
        let f = fixture();
        for i in 0..30 {
            f.store
                .add_user(&format!("Bulk User {i}"), None, RoleFlags::default())
                .expect("user");
        }
        let found = f
            .admin
            .search_candidates(TenantKey::Bahamas, "bulk")
            .await
            .expect("search");
        assert_eq!(found.len(), 20);
    }

    #[tokio::test]
    async fn test_unconfigured_tenant() {
        let f = fixture();
        let err = f
            .admin
            .list(TenantKey::Cayman, f.manager.id)
            .await
            .unwrap_err();
        assert!(matches!(err, HierarchyAdminError::Registry(_)));
    }
}
