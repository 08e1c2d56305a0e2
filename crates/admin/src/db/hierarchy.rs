//! Hierarchy edge repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bankdesk_core::{HierarchyEdgeId, RelationKind, TenantKey, UserId};

use super::{RepositoryError, conflict_or_database};
use crate::models::hierarchy::{HierarchyEdge, NewHierarchyEdge};

/// Internal row type for `PostgreSQL` hierarchy queries.
#[derive(Debug, sqlx::FromRow)]
struct HierarchyEdgeRow {
    id: i32,
    superior_id: i32,
    subordinate_id: i32,
    relation_kind: RelationKind,
    created_at: DateTime<Utc>,
}

impl HierarchyEdgeRow {
    fn into_edge(self, tenant: TenantKey) -> HierarchyEdge {
        HierarchyEdge {
            id: HierarchyEdgeId::new(self.id),
            superior_id: UserId::new(self.superior_id),
            subordinate_id: UserId::new(self.subordinate_id),
            kind: self.relation_kind,
            tenant,
            created_at: self.created_at,
        }
    }
}

/// Repository for `user_hierarchy` in one tenant database.
pub struct HierarchyRepository<'a> {
    pool: &'a PgPool,
    tenant: TenantKey,
}

impl<'a> HierarchyRepository<'a> {
    /// Create a new hierarchy repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool, tenant: TenantKey) -> Self {
        Self { pool, tenant }
    }

    /// Edges of one kind owned by any of the given superiors.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn edges_from_any(
        &self,
        superior_ids: &[UserId],
        kind: RelationKind,
    ) -> Result<Vec<HierarchyEdge>, RepositoryError> {
        let ids: Vec<i32> = superior_ids.iter().map(UserId::as_i32).collect();

        let rows = sqlx::query_as::<_, HierarchyEdgeRow>(
            r"
            SELECT id, superior_id, subordinate_id, relation_kind, created_at
            FROM user_hierarchy
            WHERE superior_id = ANY($1) AND relation_kind = $2
            ORDER BY id ASC
            ",
        )
        .bind(ids)
        .bind(kind)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_edge(self.tenant)).collect())
    }

    /// Every edge owned by one superior, any kind.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_superior(
        &self,
        superior_id: UserId,
    ) -> Result<Vec<HierarchyEdge>, RepositoryError> {
        let rows = sqlx::query_as::<_, HierarchyEdgeRow>(
            r"
            SELECT id, superior_id, subordinate_id, relation_kind, created_at
            FROM user_hierarchy
            WHERE superior_id = $1
            ORDER BY id ASC
            ",
        )
        .bind(superior_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_edge(self.tenant)).collect())
    }

    /// Insert an edge.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the same edge already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert(&self, edge: &NewHierarchyEdge) -> Result<HierarchyEdge, RepositoryError> {
        let row = sqlx::query_as::<_, HierarchyEdgeRow>(
            r"
            INSERT INTO user_hierarchy (superior_id, subordinate_id, relation_kind)
            VALUES ($1, $2, $3)
            RETURNING id, superior_id, subordinate_id, relation_kind, created_at
            ",
        )
        .bind(edge.superior_id.as_i32())
        .bind(edge.subordinate_id.as_i32())
        .bind(edge.kind)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "hierarchy edge already exists"))?;

        Ok(row.into_edge(self.tenant))
    }

    /// Delete an edge.
    ///
    /// # Returns
    ///
    /// Returns `true` if the edge was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: HierarchyEdgeId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM user_hierarchy WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
