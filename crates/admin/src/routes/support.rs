//! Support inbox route handlers.
//!
//! Every session-scoped handler runs `ensure_visible` first, so a staff
//! member can only read or mutate sessions their access set permits.

use std::convert::Infallible;

use async_stream::stream;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{delete, get, post},
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use bankdesk_core::{ChatSessionId, TenantKey};

use crate::access::{AccessSet, resolve_access};
use crate::error::AppError;
use crate::middleware::CurrentStaff;
use crate::models::{ChatMessage, SessionRef};
use crate::services::{
    AggregatedInbox, BulkDeleteReport, InboxSync, InboxWatcher, ThreadSnapshot, ThreadSync,
    ThreadWatcher,
};
use crate::state::AppState;

use super::tenant_param;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/support/access/{tenant}", get(access))
        .route("/support/sessions", get(list_sessions))
        .route("/support/sessions/stream", get(stream_sessions))
        .route("/support/sessions/bulk-delete", post(bulk_delete))
        .route("/support/sessions/{tenant}/{id}", delete(delete_session))
        .route(
            "/support/sessions/{tenant}/{id}/messages",
            get(thread).post(send_message),
        )
        .route("/support/sessions/{tenant}/{id}/stream", get(stream_thread))
        .route("/support/sessions/{tenant}/{id}/close", post(close_session))
}

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub tenant: TenantKey,
    pub access: AccessSet,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub sessions: Vec<SessionRef>,
}

fn session_param(tenant: &str, id: i32) -> Result<SessionRef, AppError> {
    Ok(SessionRef::new(tenant_param(tenant)?, ChatSessionId::new(id)))
}

// =============================================================================
// Handlers
// =============================================================================

/// Resolved access set of the caller in one tenant.
async fn access(
    State(state): State<AppState>,
    staff: CurrentStaff,
    Path(tenant): Path<String>,
) -> Result<Json<AccessResponse>, AppError> {
    let tenant = tenant_param(&tenant)?;
    let store = state.pools().store(tenant)?;
    let access = resolve_access(&staff.identity, store.as_ref()).await?;
    Ok(Json(AccessResponse { tenant, access }))
}

/// One aggregation pass over every tenant.
async fn list_sessions(
    State(state): State<AppState>,
    staff: CurrentStaff,
) -> Result<Json<AggregatedInbox>, AppError> {
    let inbox = state.aggregator().aggregate(&staff.identity).await?;
    Ok(Json(inbox))
}

/// Inbox snapshots as server-sent events, one per change.
async fn stream_sessions(
    State(state): State<AppState>,
    staff: CurrentStaff,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let sync = InboxSync::new(state.aggregator(), staff.identity);
    let watcher = InboxWatcher::spawn(sync, state.sync_config().inbox_interval);
    state.views().watch_inbox(watcher.handle()).await;
    let snapshots = watcher.subscribe();

    Sse::new(snapshot_events(snapshots, watcher, "inbox")).keep_alive(KeepAlive::default())
}

/// Read a thread once. Client messages are marked read as a side effect.
async fn thread(
    State(state): State<AppState>,
    staff: CurrentStaff,
    Path((tenant, id)): Path<(String, i32)>,
) -> Result<Json<ThreadSnapshot>, AppError> {
    let session = session_param(&tenant, id)?;
    state
        .gateway()
        .ensure_visible(&staff.identity, session)
        .await?;

    let mut sync = ThreadSync::new(state.pools().clone());
    sync.select(session);
    sync.poll().await?;
    Ok(Json(sync.snapshot()))
}

/// Thread snapshots as server-sent events.
async fn stream_thread(
    State(state): State<AppState>,
    staff: CurrentStaff,
    Path((tenant, id)): Path<(String, i32)>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let session = session_param(&tenant, id)?;
    state
        .gateway()
        .ensure_visible(&staff.identity, session)
        .await?;

    let sync = ThreadSync::new(state.pools().clone());
    let watcher = ThreadWatcher::spawn(sync, state.sync_config().thread_interval);
    if !watcher.select(session).await {
        return Err(AppError::Internal("thread watcher stopped".to_string()));
    }
    state.views().watch_thread(session, watcher.handle()).await;
    let snapshots = watcher.subscribe();

    Ok(Sse::new(snapshot_events(snapshots, watcher, "thread")).keep_alive(KeepAlive::default()))
}

/// Post a staff reply. On failure the response carries the draft back.
async fn send_message(
    State(state): State<AppState>,
    staff: CurrentStaff,
    Path((tenant, id)): Path<(String, i32)>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), Response> {
    let session = session_param(&tenant, id).map_err(IntoResponse::into_response)?;
    let gateway = state.gateway();
    gateway
        .ensure_visible(&staff.identity, session)
        .await
        .map_err(|e| AppError::from(e).into_response())?;

    let sender_name = if staff.name.trim().is_empty() {
        state.staff_name()
    } else {
        staff.name.as_str()
    };
    let message = gateway
        .send_message(session, sender_name, &request.body)
        .await
        .map_err(IntoResponse::into_response)?;
    state.views().message_sent(session, &message).await;

    Ok((StatusCode::CREATED, Json(message)))
}

async fn close_session(
    State(state): State<AppState>,
    staff: CurrentStaff,
    Path((tenant, id)): Path<(String, i32)>,
) -> Result<StatusCode, AppError> {
    let session = session_param(&tenant, id)?;
    let gateway = state.gateway();
    gateway.ensure_visible(&staff.identity, session).await?;
    gateway.close_session(session).await?;
    state.views().sessions_changed(&[session]).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_session(
    State(state): State<AppState>,
    staff: CurrentStaff,
    Path((tenant, id)): Path<(String, i32)>,
) -> Result<StatusCode, AppError> {
    let session = session_param(&tenant, id)?;
    let gateway = state.gateway();
    gateway.ensure_visible(&staff.identity, session).await?;
    gateway.delete_session(session).await?;
    state.views().sessions_changed(&[session]).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete every listed session the caller may see. Always 200 with a report.
async fn bulk_delete(
    State(state): State<AppState>,
    staff: CurrentStaff,
    Json(request): Json<BulkDeleteRequest>,
) -> Json<BulkDeleteReport> {
    let gateway = state.gateway();
    let mut rejected = BulkDeleteReport::default();
    let mut visible = Vec::with_capacity(request.sessions.len());

    for session in request.sessions {
        match gateway.ensure_visible(&staff.identity, session).await {
            Ok(_) => visible.push(session),
            Err(e) => rejected.record_failure(session, e),
        }
    }

    let mut report = gateway.bulk_delete(&visible).await;
    if report.deleted > 0 {
        state.views().sessions_changed(&visible).await;
    }
    report.failed.extend(rejected.failed);
    Json(report)
}

// =============================================================================
// Streaming
// =============================================================================

/// Emit every published snapshot. The stream owns the watcher, so the
/// polling task stops when the client disconnects.
fn snapshot_events<T, W>(
    mut snapshots: watch::Receiver<T>,
    watcher: W,
    event: &'static str,
) -> impl Stream<Item = Result<Event, Infallible>>
where
    T: Serialize + Clone + Send + Sync + 'static,
    W: Send + 'static,
{
    stream! {
        let _watcher = watcher;
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            let data = serde_json::to_string(&snapshot).unwrap_or_else(|_| {
                r#"{"state":"error","message":"Failed to serialize snapshot"}"#.to_string()
            });
            yield Ok(Event::default().event(event).data(data));
        }
    }
}
