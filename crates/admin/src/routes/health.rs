//! Health check endpoints.

use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable unless every tenant store answers.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    let checks = state.pools().iter().map(|(key, store)| async move {
        store
            .ping()
            .await
            .inspect_err(|e| tracing::warn!(tenant = %key, error = %e, "Tenant store not ready"))
    });
    let results = futures::future::join_all(checks).await;

    if !state.pools().is_empty() && results.iter().all(Result::is_ok) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
