//! HTTP route handlers for the support desk.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                                   Liveness
//! GET    /health/ready                             Every tenant store answers
//!
//! # Support inbox (any staff member)
//! GET    /support/access/{tenant}                  Resolved access set
//! GET    /support/sessions                         Aggregated inbox
//! GET    /support/sessions/stream                  Inbox snapshots (SSE)
//! POST   /support/sessions/bulk-delete             Delete many sessions
//! GET    /support/sessions/{tenant}/{id}/messages  Thread read (marks read)
//! GET    /support/sessions/{tenant}/{id}/stream    Thread snapshots (SSE)
//! POST   /support/sessions/{tenant}/{id}/messages  Send a reply
//! POST   /support/sessions/{tenant}/{id}/close     Close a session
//! DELETE /support/sessions/{tenant}/{id}           Delete a session
//!
//! # Hierarchy
//! GET    /hierarchy/{tenant}/edges?superior_id=    List edges
//! POST   /hierarchy/{tenant}/edges                 Create edge (admin)
//! DELETE /hierarchy/{tenant}/edges/{id}            Delete edge (admin)
//! GET    /hierarchy/{tenant}/candidates?q=         Search users (admin)
//! ```

pub mod health;
pub mod hierarchy;
pub mod support;

use axum::Router;

use bankdesk_core::TenantKey;

use crate::error::AppError;
use crate::state::AppState;
use crate::tenancy::TenantRegistry;

/// Build the full router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(support::router())
        .merge(hierarchy::router())
}

/// Parse a `{tenant}` path segment.
fn tenant_param(raw: &str) -> Result<TenantKey, AppError> {
    Ok(TenantRegistry::lookup(raw)?.key)
}
