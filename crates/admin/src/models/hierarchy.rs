//! Manager hierarchy edges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bankdesk_core::{HierarchyEdgeId, RelationKind, TenantKey, UserId};

/// One supervision edge. Both endpoints live in the edge's tenant.
///
/// Edges are never updated; they are replaced by delete + create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyEdge {
    pub id: HierarchyEdgeId,
    pub superior_id: UserId,
    pub subordinate_id: UserId,
    pub kind: RelationKind,
    pub tenant: TenantKey,
    pub created_at: DateTime<Utc>,
}

/// Values for inserting an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct NewHierarchyEdge {
    pub superior_id: UserId,
    pub subordinate_id: UserId,
    pub kind: RelationKind,
}
