//! Hierarchy administration route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
};
use serde::Deserialize;

use bankdesk_core::{HierarchyEdgeId, UserId};

use crate::error::AppError;
use crate::middleware::{CurrentStaff, RequireAdmin};
use crate::models::{HierarchyEdge, NewHierarchyEdge, UserRecord};
use crate::state::AppState;

use super::tenant_param;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/hierarchy/{tenant}/edges", get(list_edges).post(create_edge))
        .route("/hierarchy/{tenant}/edges/{id}", delete(delete_edge))
        .route("/hierarchy/{tenant}/candidates", get(candidates))
}

#[derive(Debug, Deserialize)]
pub struct EdgesQuery {
    pub superior_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct CandidatesQuery {
    #[serde(default)]
    pub q: String,
}

/// Edges owned by one superior. Admins may list anyone's; others only their own.
async fn list_edges(
    State(state): State<AppState>,
    staff: CurrentStaff,
    Path(tenant): Path<String>,
    Query(query): Query<EdgesQuery>,
) -> Result<Json<Vec<HierarchyEdge>>, AppError> {
    let tenant = tenant_param(&tenant)?;
    let superior_id = UserId::new(query.superior_id);

    let is_self = staff.identity.tenant == tenant && staff.identity.id == superior_id;
    if !staff.identity.roles.is_admin && !is_self {
        return Err(AppError::Forbidden(
            "Only admins can view another staff member's hierarchy".to_string(),
        ));
    }

    let edges = state.hierarchy().list(tenant, superior_id).await?;
    Ok(Json(edges))
}

async fn create_edge(
    State(state): State<AppState>,
    RequireAdmin(staff): RequireAdmin,
    Path(tenant): Path<String>,
    Json(edge): Json<NewHierarchyEdge>,
) -> Result<(StatusCode, Json<HierarchyEdge>), AppError> {
    let tenant = tenant_param(&tenant)?;
    let created = state.hierarchy().assign(tenant, edge).await?;
    tracing::info!(
        admin_id = %staff.identity.id,
        edge_id = %created.id,
        "Hierarchy edge created via admin"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

async fn delete_edge(
    State(state): State<AppState>,
    RequireAdmin(staff): RequireAdmin,
    Path((tenant, id)): Path<(String, i32)>,
) -> Result<StatusCode, AppError> {
    let tenant = tenant_param(&tenant)?;
    let edge_id = HierarchyEdgeId::new(id);
    state.hierarchy().unassign(tenant, edge_id).await?;
    tracing::info!(
        admin_id = %staff.identity.id,
        edge_id = %edge_id,
        "Hierarchy edge removed via admin"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Users matching `q`, for picking either end of a new edge.
async fn candidates(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(tenant): Path<String>,
    Query(query): Query<CandidatesQuery>,
) -> Result<Json<Vec<UserRecord>>, AppError> {
    let tenant = tenant_param(&tenant)?;
    let users = state.hierarchy().search_candidates(tenant, &query.q).await?;
    Ok(Json(users))
}
