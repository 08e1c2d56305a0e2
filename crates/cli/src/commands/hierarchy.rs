//! Supervision edge management.
//!
//! Goes through the same validation as the HTTP surface: role checks,
//! no self-edges, no duplicates.

use bankdesk_admin::models::NewHierarchyEdge;
use bankdesk_admin::services::HierarchyAdmin;
use bankdesk_admin::tenancy::TenantPools;
use bankdesk_core::{HierarchyEdgeId, RelationKind, TenantKey, UserId};

use super::{CommandError, connect};

async fn admin_for(key: TenantKey) -> Result<(HierarchyAdmin, TenantPools), CommandError> {
    let pools = TenantPools::from_stores([connect(key).await?]);
    Ok((HierarchyAdmin::new(pools.clone()), pools))
}

/// Create an edge.
pub async fn assign(
    tenant: TenantKey,
    superior: i32,
    subordinate: i32,
    kind: RelationKind,
) -> Result<(), CommandError> {
    let (admin, pools) = admin_for(tenant).await?;
    let edge = admin
        .assign(
            tenant,
            NewHierarchyEdge {
                superior_id: UserId::new(superior),
                subordinate_id: UserId::new(subordinate),
                kind,
            },
        )
        .await;
    pools.close().await;
    let edge = edge?;

    tracing::info!(
        "Edge {} created: {} -> {} ({})",
        edge.id,
        edge.superior_id,
        edge.subordinate_id,
        edge.kind
    );
    Ok(())
}

/// Delete an edge.
pub async fn remove(tenant: TenantKey, edge: i32) -> Result<(), CommandError> {
    let (admin, pools) = admin_for(tenant).await?;
    let result = admin.unassign(tenant, HierarchyEdgeId::new(edge)).await;
    pools.close().await;
    result?;

    tracing::info!("Edge {} removed from {}", edge, tenant);
    Ok(())
}

/// Log every edge owned by `superior`.
pub async fn list(tenant: TenantKey, superior: i32) -> Result<(), CommandError> {
    let (admin, pools) = admin_for(tenant).await?;
    let edges = admin.list(tenant, UserId::new(superior)).await;
    pools.close().await;
    let edges = edges?;

    if edges.is_empty() {
        tracing::info!("User {} supervises nobody in {}", superior, tenant);
    }
    for edge in edges {
        tracing::info!(
            "  [{}] {} -> {} ({}, since {})",
            edge.id,
            edge.superior_id,
            edge.subordinate_id,
            edge.kind,
            edge.created_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}
