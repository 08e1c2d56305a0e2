//! Live-support chat domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bankdesk_core::{ChatMessageId, ChatSessionId, SenderType, SessionStatus, TenantKey, UserId};

/// A live-support conversation between an end user and the back office.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    /// Session ID, unique within its tenant.
    pub id: ChatSessionId,
    /// Tenant store that owns this session.
    pub tenant: TenantKey,
    /// End user who opened the session, if they were signed in.
    pub client_user_id: Option<UserId>,
    /// Name the client gave when starting the conversation.
    pub client_name: String,
    /// Contact email the client gave, if any.
    pub client_email: Option<String>,
    /// Whether the conversation is still open.
    pub status: SessionStatus,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session row was last modified.
    pub updated_at: DateTime<Utc>,
    /// When the latest message was posted.
    pub last_message_at: DateTime<Utc>,
}

impl ChatSession {
    /// Reference to this session across tenants.
    #[must_use]
    pub const fn session_ref(&self) -> SessionRef {
        SessionRef {
            tenant: self.tenant,
            session_id: self.id,
        }
    }
}

/// A message in a live-support session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message ID, unique within its tenant.
    pub id: ChatMessageId,
    /// Session this message belongs to (same tenant).
    pub session_id: ChatSessionId,
    /// Who wrote the message.
    pub sender_type: SenderType,
    /// Display name of the author.
    pub sender_name: String,
    /// Message text.
    pub body: String,
    /// When the message was posted.
    pub created_at: DateTime<Utc>,
    /// Set once a staff member has seen the message. Never reset.
    pub read_by_admin: bool,
    /// Set once the client has seen the message. Never reset.
    pub read_by_client: bool,
}

impl ChatMessage {
    /// A client-authored message no staff member has seen yet.
    #[must_use]
    pub fn is_unread_client_message(&self) -> bool {
        self.sender_type == SenderType::Client && !self.read_by_admin
    }
}

/// Values for inserting a new message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatMessage {
    pub session_id: ChatSessionId,
    pub sender_type: SenderType,
    pub sender_name: String,
    pub body: String,
    pub read_by_admin: bool,
    pub read_by_client: bool,
}

impl NewChatMessage {
    /// A reply written by staff: already read on the admin side, unread by the client.
    #[must_use]
    pub fn staff_reply(session_id: ChatSessionId, sender_name: &str, body: &str) -> Self {
        Self {
            session_id,
            sender_type: SenderType::Admin,
            sender_name: sender_name.to_owned(),
            body: body.to_owned(),
            read_by_admin: true,
            read_by_client: false,
        }
    }
}

/// Tenant-qualified session reference.
///
/// Session IDs repeat across tenants, so every write and every thread view
/// addresses a session through this pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionRef {
    pub tenant: TenantKey,
    pub session_id: ChatSessionId,
}

impl SessionRef {
    #[must_use]
    pub const fn new(tenant: TenantKey, session_id: ChatSessionId) -> Self {
        Self { tenant, session_id }
    }
}

impl std::fmt::Display for SessionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.tenant, self.session_id)
    }
}

/// A session as shown in the cross-tenant inbox.
///
/// Exists only in memory; rebuilt on every aggregation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedSession {
    #[serde(flatten)]
    pub session: ChatSession,
    /// Display name of the owning tenant.
    pub tenant_display_name: &'static str,
    /// Client messages with `read_by_admin = false`.
    pub unread_count: u64,
}
