//! Request extractors for the support desk.
//!
//! Authentication happens upstream: the identity provider forwards the
//! signed-in staff member as `x-staff-id` and `x-staff-tenant`. Role flags
//! are always read fresh from that tenant's `users` table.

pub mod staff;

pub use staff::{CurrentStaff, RequireAdmin, STAFF_ID_HEADER, STAFF_TENANT_HEADER};
