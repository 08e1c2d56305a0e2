//! User repository: role flags and candidate search.
//!
//! Users are created and edited by user management; this repository only reads.

use sqlx::PgPool;

use bankdesk_core::{RoleFlags, TenantKey, UserId};

use super::RepositoryError;
use crate::models::staff::UserRecord;

/// Internal row type for `PostgreSQL` user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    name: String,
    email: Option<String>,
    is_admin: bool,
    is_manager: bool,
    is_superior_manager: bool,
}

impl UserRow {
    fn into_record(self, tenant: TenantKey) -> UserRecord {
        UserRecord {
            id: UserId::new(self.id),
            tenant,
            name: self.name,
            email: self.email,
            roles: RoleFlags {
                is_admin: self.is_admin,
                is_manager: self.is_manager,
                is_superior_manager: self.is_superior_manager,
            },
        }
    }
}

/// Repository for user lookups in one tenant database.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
    tenant: TenantKey,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool, tenant: TenantKey) -> Self {
        Self { pool, tenant }
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: UserId) -> Result<Option<UserRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, name, email, is_admin, is_manager, is_superior_manager
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| r.into_record(self.tenant)))
    }

    /// Case-insensitive substring search on name and email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, query: &str, limit: i64) -> Result<Vec<UserRecord>, RepositoryError> {
        let pattern = format!("%{}%", escape_like(query));

        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, name, email, is_admin, is_manager, is_superior_manager
            FROM users
            WHERE name ILIKE $1 ESCAPE '\' OR email ILIKE $1 ESCAPE '\'
            ORDER BY name ASC, id ASC
            LIMIT $2
            ",
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| r.into_record(self.tenant))
            .collect())
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
