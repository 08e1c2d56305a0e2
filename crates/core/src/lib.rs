//! Bankdesk Core - Shared types library.
//!
//! This crate provides common types used across all Bankdesk components:
//! - `admin` - Back-office support desk (hierarchy access, cross-tenant inbox, live chat)
//! - `cli` - Command-line tools for migrations and hierarchy management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, tenant keys, role flags, and status enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
