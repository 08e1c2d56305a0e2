//! Core types for the support desk.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod role;
pub mod status;
pub mod tenant;

pub use id::*;
pub use role::RoleFlags;
pub use status::*;
pub use tenant::{TenantKey, UnknownTenant};
