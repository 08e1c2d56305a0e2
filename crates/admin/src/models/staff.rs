//! Staff and end-user identities.

use serde::{Deserialize, Serialize};

use bankdesk_core::{RoleFlags, TenantKey, UserId};

/// The staff member operating the support desk.
///
/// Supplied by the identity provider when the panel opens; read-only here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffIdentity {
    pub id: UserId,
    /// Tenant the identity was issued by.
    pub tenant: TenantKey,
    pub roles: RoleFlags,
}

/// A row of a tenant's `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub tenant: TenantKey,
    pub name: String,
    pub email: Option<String>,
    pub roles: RoleFlags,
}

impl UserRecord {
    /// View this user as a staff identity.
    #[must_use]
    pub const fn as_staff(&self) -> StaffIdentity {
        StaffIdentity {
            id: self.id,
            tenant: self.tenant,
            roles: self.roles,
        }
    }
}
