//! Unified error handling for the support desk HTTP surface.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::access::ResolutionError;
use crate::db::RepositoryError;
use crate::models::StaffIdentity;
use crate::services::{GatewayError, HierarchyAdminError, InboxError, SendFailure, ThreadSyncError};
use crate::tenancy::RegistryError;

/// Application-level error type for the support desk.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// A tenant store or the hierarchy lookup is unavailable.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Staff identity missing or unknown.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Staff member lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with existing data.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// Message safe to show to the caller.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Unavailable(_) => "Service temporarily unavailable".to_string(),
            _ => self.to_string(),
        }
    }

    /// Report server-side errors to Sentry and the log.
    fn capture(&self) {
        if matches!(
            self,
            Self::Database(_) | Self::Internal(_) | Self::Unavailable(_)
        ) {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Support desk request error"
            );
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.capture();

        // Don't expose internal error details to clients
        (self.status(), self.public_message()).into_response()
    }
}

/// A failed send answers with the draft so the panel can restore it.
impl IntoResponse for SendFailure {
    fn into_response(self) -> Response {
        let error = AppError::from(self.source);
        error.capture();

        (
            error.status(),
            Json(json!({
                "error": error.public_message(),
                "draft": self.draft,
            })),
        )
            .into_response()
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::TenantNotFound(_) => Self::NotFound(err.to_string()),
            RegistryError::MissingConnection(_) => Self::Unavailable(err.to_string()),
        }
    }
}

impl From<ResolutionError> for AppError {
    fn from(err: ResolutionError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<InboxError> for AppError {
    fn from(err: InboxError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Registry(e) => e.into(),
            GatewayError::Resolution(e) => e.into(),
            GatewayError::Store(e) => Self::Database(e),
            GatewayError::SessionNotFound(_) => Self::NotFound(err.to_string()),
            GatewayError::NotVisible(_) => Self::Forbidden(err.to_string()),
            GatewayError::EmptyMessage => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<ThreadSyncError> for AppError {
    fn from(err: ThreadSyncError) -> Self {
        match err {
            ThreadSyncError::Registry(e) => e.into(),
            ThreadSyncError::Fetch { source, .. } | ThreadSyncError::MarkRead { source, .. } => {
                Self::Database(source)
            }
        }
    }
}

impl From<HierarchyAdminError> for AppError {
    fn from(err: HierarchyAdminError) -> Self {
        match err {
            HierarchyAdminError::Registry(e) => e.into(),
            HierarchyAdminError::Store(e) => Self::Database(e),
            HierarchyAdminError::UserNotFound(_) | HierarchyAdminError::EdgeNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            HierarchyAdminError::SelfEdge | HierarchyAdminError::MissingRole { .. } => {
                Self::BadRequest(err.to_string())
            }
            HierarchyAdminError::Duplicate => Self::Conflict(err.to_string()),
        }
    }
}

/// Set the Sentry user context from the calling staff member.
pub fn set_sentry_staff(staff: &StaffIdentity) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(staff.id.to_string()),
            ..Default::default()
        }));
        scope.set_tag("staff_tenant", staff.tenant);
    });
}
