//! Database migration commands.
//!
//! Every tenant database carries the same schema, from
//! `crates/admin/migrations/`.
//!
//! # Usage
//!
//! ```bash
//! bankdesk migrate bahamas
//! bankdesk migrate all
//! ```
//!
//! # Environment Variables
//!
//! - `CAYMAN_DATABASE_URL`, `BAHAMAS_DATABASE_URL`, `BERMUDA_DATABASE_URL`

use bankdesk_admin::config::TenantConnection;
use bankdesk_admin::db;
use bankdesk_core::TenantKey;

use super::CommandError;

/// Run migrations against one tenant database.
pub async fn tenant(key: TenantKey) -> Result<(), CommandError> {
    let connection = TenantConnection::from_env(key)?;

    tracing::info!(tenant = %key, "Connecting to tenant database...");
    let pool = db::create_pool(&connection.database_url).await?;

    tracing::info!(tenant = %key, "Running migrations...");
    sqlx::migrate!("../admin/migrations").run(&pool).await?;
    pool.close().await;

    tracing::info!(tenant = %key, "Migrations complete!");
    Ok(())
}

/// Run migrations against every tenant, stopping at the first failure.
pub async fn all() -> Result<(), CommandError> {
    for key in TenantKey::ALL {
        tenant(key).await?;
    }
    Ok(())
}
