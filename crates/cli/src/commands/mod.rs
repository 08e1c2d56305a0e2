//! CLI subcommands.

pub mod hierarchy;
pub mod inbox;
pub mod migrate;

use std::sync::Arc;

use thiserror::Error;

use bankdesk_admin::config::{ConfigError, TenantConnection};
use bankdesk_admin::db::{self, PgSupportStore, RepositoryError, SupportStore};
use bankdesk_admin::services::{HierarchyAdminError, InboxError};
use bankdesk_admin::tenancy::RegistryError;
use bankdesk_core::{TenantKey, UserId};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Store(#[from] RepositoryError),

    #[error(transparent)]
    Hierarchy(#[from] HierarchyAdminError),

    #[error(transparent)]
    Inbox(#[from] InboxError),

    #[error("No user {0} in {1}")]
    UnknownStaff(UserId, TenantKey),
}

/// Connect eagerly to one tenant database.
async fn connect(key: TenantKey) -> Result<Arc<dyn SupportStore>, CommandError> {
    let connection = TenantConnection::from_env(key)?;
    tracing::info!(tenant = %key, "Connecting to tenant database...");
    let pool = db::create_pool(&connection.database_url).await?;
    Ok(Arc::new(PgSupportStore::new(key, pool)))
}
