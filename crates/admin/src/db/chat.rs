//! Database operations for live-support sessions and messages.
//!
//! Queries are checked at runtime (`query_as::<_, Row>`) because the same
//! statements run against three tenant databases.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bankdesk_core::{
    ChatMessageId, ChatSessionId, SenderType, SessionStatus, TenantKey, UserId,
};

use super::{RepositoryError, missing_or_database};
use crate::models::chat::{ChatMessage, ChatSession, NewChatMessage};

const SESSION_COLUMNS: &str = "id, client_user_id, client_name, client_email, status, \
                               created_at, updated_at, last_message_at";

const MESSAGE_COLUMNS: &str = "id, session_id, sender_type, sender_name, body, \
                               created_at, read_by_admin, read_by_client";

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` chat session queries.
#[derive(Debug, sqlx::FromRow)]
struct ChatSessionRow {
    id: i32,
    client_user_id: Option<i32>,
    client_name: String,
    client_email: Option<String>,
    status: SessionStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_message_at: DateTime<Utc>,
}

impl ChatSessionRow {
    fn into_session(self, tenant: TenantKey) -> ChatSession {
        ChatSession {
            id: ChatSessionId::new(self.id),
            tenant,
            client_user_id: self.client_user_id.map(UserId::new),
            client_name: self.client_name,
            client_email: self.client_email,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_message_at: self.last_message_at,
        }
    }
}

/// Internal row type for `PostgreSQL` chat message queries.
#[derive(Debug, sqlx::FromRow)]
struct ChatMessageRow {
    id: i32,
    session_id: i32,
    sender_type: SenderType,
    sender_name: String,
    body: String,
    created_at: DateTime<Utc>,
    read_by_admin: bool,
    read_by_client: bool,
}

impl From<ChatMessageRow> for ChatMessage {
    fn from(row: ChatMessageRow) -> Self {
        Self {
            id: ChatMessageId::new(row.id),
            session_id: ChatSessionId::new(row.session_id),
            sender_type: row.sender_type,
            sender_name: row.sender_name,
            body: row.body,
            created_at: row.created_at,
            read_by_admin: row.read_by_admin,
            read_by_client: row.read_by_client,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for chat database operations in one tenant database.
pub struct ChatRepository<'a> {
    pool: &'a PgPool,
    tenant: TenantKey,
}

impl<'a> ChatRepository<'a> {
    /// Create a new chat repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool, tenant: TenantKey) -> Self {
        Self { pool, tenant }
    }

    /// List every session in the tenant, most recent activity first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_sessions(&self) -> Result<Vec<ChatSession>, RepositoryError> {
        let rows = sqlx::query_as::<_, ChatSessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions ORDER BY last_message_at DESC, id ASC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.into_session(self.tenant))
            .collect())
    }

    /// List sessions opened by any of the given clients.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_sessions_for_clients(
        &self,
        client_ids: &[UserId],
    ) -> Result<Vec<ChatSession>, RepositoryError> {
        let ids: Vec<i32> = client_ids.iter().map(UserId::as_i32).collect();

        let rows = sqlx::query_as::<_, ChatSessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions \
             WHERE client_user_id = ANY($1) \
             ORDER BY last_message_at DESC, id ASC"
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.into_session(self.tenant))
            .collect())
    }

    /// Get a chat session by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_session(
        &self,
        id: ChatSessionId,
    ) -> Result<Option<ChatSession>, RepositoryError> {
        let row = sqlx::query_as::<_, ChatSessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| r.into_session(self.tenant)))
    }

    /// Set a session's status.
    ///
    /// # Returns
    ///
    /// Returns `true` if the session exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_status(
        &self,
        id: ChatSessionId,
        status: SessionStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE chat_sessions
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            ",
        )
        .bind(status)
        .bind(id.as_i32())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Bump `updated_at` and `last_message_at` after a new message.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the session doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn touch_session(
        &self,
        id: ChatSessionId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE chat_sessions
            SET updated_at = $1, last_message_at = $1
            WHERE id = $2
            ",
        )
        .bind(at)
        .bind(id.as_i32())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Delete a session row. Messages must already be gone.
    ///
    /// # Returns
    ///
    /// Returns `true` if the session was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, including a
    /// foreign-key violation when messages still reference the session.
    pub async fn delete_session(&self, id: ChatSessionId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM chat_sessions WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Get all messages for a session.
    ///
    /// Returns messages ordered by creation time (oldest first).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_messages(
        &self,
        session_id: ChatSessionId,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query_as::<_, ChatMessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages \
             WHERE session_id = $1 \
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(session_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Count client messages no staff member has read.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_unread_client_messages(
        &self,
        session_id: ChatSessionId,
    ) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*)
            FROM chat_messages
            WHERE session_id = $1
              AND sender_type = 'client'
              AND read_by_admin = FALSE
            ",
        )
        .bind(session_id.as_i32())
        .fetch_one(self.pool)
        .await?;

        u64::try_from(count)
            .map_err(|_| RepositoryError::DataCorruption(format!("negative count: {count}")))
    }

    /// Add a message to a session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the session no longer exists,
    /// `RepositoryError::Database` if the query fails otherwise.
    pub async fn add_message(&self, message: &NewChatMessage) -> Result<ChatMessage, RepositoryError> {
        let row = sqlx::query_as::<_, ChatMessageRow>(&format!(
            "INSERT INTO chat_messages \
                 (session_id, sender_type, sender_name, body, read_by_admin, read_by_client) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(message.session_id.as_i32())
        .bind(message.sender_type)
        .bind(&message.sender_name)
        .bind(&message.body)
        .bind(message.read_by_admin)
        .bind(message.read_by_client)
        .fetch_one(self.pool)
        .await
        .map_err(missing_or_database)?;

        Ok(row.into())
    }

    /// Mark messages as read by staff.
    ///
    /// Only flips `false` to `true`; rows already read are left untouched.
    ///
    /// # Returns
    ///
    /// Number of messages that changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_read_by_admin(&self, ids: &[ChatMessageId]) -> Result<u64, RepositoryError> {
        let ids: Vec<i32> = ids.iter().map(ChatMessageId::as_i32).collect();

        let result = sqlx::query(
            r"
            UPDATE chat_messages
            SET read_by_admin = TRUE
            WHERE id = ANY($1) AND read_by_admin = FALSE
            ",
        )
        .bind(ids)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete every message of a session.
    ///
    /// # Returns
    ///
    /// Number of messages deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_messages(&self, session_id: ChatSessionId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM chat_messages WHERE session_id = $1")
            .bind(session_id.as_i32())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
