//! Staff identity extractors.

use axum::{extract::FromRequestParts, http::request::Parts};

use bankdesk_core::{TenantKey, UserId};

use crate::error::{AppError, set_sentry_staff};
use crate::models::StaffIdentity;
use crate::state::AppState;

/// Header carrying the staff member's user ID.
pub const STAFF_ID_HEADER: &str = "x-staff-id";
/// Header carrying the tenant that issued the staff identity.
pub const STAFF_TENANT_HEADER: &str = "x-staff-tenant";

/// Extractor for the staff member making the request.
///
/// Rejects with 401 if the headers are missing or name an unknown user,
/// and with 503 if the issuing tenant's store cannot be reached.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(staff: CurrentStaff) -> impl IntoResponse {
///     format!("Hello, {}!", staff.name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentStaff {
    pub identity: StaffIdentity,
    pub name: String,
}

impl FromRequestParts<AppState> for CurrentStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let id = header(parts, STAFF_ID_HEADER)?
            .trim()
            .parse::<i32>()
            .map(UserId::new)
            .map_err(|_| AppError::Unauthorized(format!("invalid {STAFF_ID_HEADER}")))?;
        let tenant = header(parts, STAFF_TENANT_HEADER)?
            .parse::<TenantKey>()
            .map_err(|e| AppError::Unauthorized(e.to_string()))?;

        let user = state
            .pools()
            .store(tenant)?
            .get_user(id)
            .await
            .map_err(|e| AppError::Unavailable(e.to_string()))?
            .ok_or_else(|| AppError::Unauthorized("unknown staff member".to_string()))?;

        let identity = user.as_staff();
        set_sentry_staff(&identity);

        Ok(Self {
            identity,
            name: user.name,
        })
    }
}

/// Extractor that additionally requires the admin flag.
///
/// Rejects with 403 if the staff member is not an admin.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub CurrentStaff);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let staff = CurrentStaff::from_request_parts(parts, state).await?;
        if !staff.identity.roles.is_admin {
            return Err(AppError::Forbidden(
                "Only admins can manage the hierarchy".to_string(),
            ));
        }
        Ok(Self(staff))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized(format!("missing {name}")))
}
