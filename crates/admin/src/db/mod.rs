//! Per-tenant persistence.
//!
//! # Databases: one `PostgreSQL` database per tenant
//!
//! Each institution's data lives in its own database; nothing here ever
//! joins across tenants. Every tenant database has the same schema:
//!
//! - `users` - Staff and end users with role flags
//! - `user_hierarchy` - Manager/superior-manager supervision edges
//! - `chat_sessions` - Live-support conversations
//! - `chat_messages` - Messages of a conversation
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run against
//! every tenant via:
//! ```bash
//! cargo run -p bankdesk-cli -- migrate all
//! ```

pub mod chat;
pub mod hierarchy;
pub mod memory;
pub mod store;
pub mod users;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use chat::ChatRepository;
pub use hierarchy::HierarchyRepository;
pub use memory::{MemoryStore, StoreOp};
pub use store::{PgSupportStore, SupportStore};
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate hierarchy edge).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The tenant store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    pool_options().connect(database_url.expose_secret()).await
}

/// Create a pool that connects on first use.
///
/// Used for tenant stores at startup so one unreachable institution does
/// not keep the desk from serving the other two.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection string cannot be parsed.
pub fn create_lazy_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    pool_options().connect_lazy(database_url.expose_secret())
}

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(0)
        .acquire_timeout(Duration::from_secs(10))
}

/// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
pub(crate) fn conflict_or_database(err: sqlx::Error, conflict: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(conflict.to_owned());
    }
    RepositoryError::Database(err)
}

/// Map a foreign-key violation to `NotFound`, anything else to `Database`.
///
/// Inserting a child row for a parent deleted in the meantime reports the
/// same error an in-memory store does.
pub(crate) fn missing_or_database(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_foreign_key_violation()
    {
        return RepositoryError::NotFound;
    }
    RepositoryError::Database(err)
}
