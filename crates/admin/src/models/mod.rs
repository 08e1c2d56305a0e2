//! Domain models for the support desk.

pub mod chat;
pub mod hierarchy;
pub mod staff;

pub use chat::{AggregatedSession, ChatMessage, ChatSession, NewChatMessage, SessionRef};
pub use hierarchy::{HierarchyEdge, NewHierarchyEdge};
pub use staff::{StaffIdentity, UserRecord};
