//! Tenant registry and per-tenant store handles.
//!
//! The registry is a static, read-only table shared by every call path.
//! [`TenantPools`] is the explicit connection object: built once when the
//! desk starts, handed to the aggregator and gateway, closed on shutdown.

mod pools;
mod registry;

use thiserror::Error;

use bankdesk_core::TenantKey;

pub use pools::TenantPools;
pub use registry::{TenantDescriptor, TenantRegistry};

/// Errors from tenant lookup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The key does not name one of the registered tenants.
    #[error("tenant not found: {0}")]
    TenantNotFound(String),

    /// The tenant is registered but no store was configured for it.
    #[error("no store configured for tenant {0}")]
    MissingConnection(TenantKey),
}
