//! Status and kind enums for support-desk records.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a live-support chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "session_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Active,
    Closed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "sender_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    /// The end user who opened the conversation.
    Client,
    /// A staff member answering from the back office.
    Admin,
}

impl std::fmt::Display for SenderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// The kind of a hierarchy edge.
///
/// The hierarchy has exactly two levels, so resolution code matches on
/// this enum exhaustively instead of comparing strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "relation_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// A manager supervises an end user.
    ManagerToUser,
    /// A superior manager supervises a manager.
    SuperiorManagerToManager,
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ManagerToUser => write!(f, "manager_to_user"),
            Self::SuperiorManagerToManager => write!(f, "superior_manager_to_manager"),
        }
    }
}

impl std::str::FromStr for RelationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manager_to_user" | "manager-to-user" => Ok(Self::ManagerToUser),
            "superior_manager_to_manager" | "superior-manager-to-manager" => {
                Ok(Self::SuperiorManagerToManager)
            }
            _ => Err(format!("invalid relation kind: {s}")),
        }
    }
}
