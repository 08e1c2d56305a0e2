//! Bankdesk support desk library.
//!
//! Cross-tenant access control and live-support chat synchronization for
//! a back office that serves several banks, each with its own database.
//!
//! # Layout
//!
//! - [`tenancy`] - Static tenant registry and per-tenant stores
//! - [`access`] - Hierarchy-based visibility of end users
//! - [`services`] - Inbox aggregation, sync engine, mutations, hierarchy admin
//! - [`routes`] - HTTP surface
//!
//! # Security
//!
//! Access resolution fails closed: if a tenant's hierarchy cannot be read,
//! no session of that tenant is shown or mutated.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod tenancy;

#[cfg(test)]
mod testing;
