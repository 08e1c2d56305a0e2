use bankdesk_core::TenantKey;

use super::RegistryError;

/// Static description of one institutional tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantDescriptor {
    pub key: TenantKey,
    /// Name shown next to the tenant's sessions in the inbox.
    pub display_name: &'static str,
    /// Environment variable holding the tenant's database URL.
    pub database_url_var: &'static str,
}

static CAYMAN: TenantDescriptor = TenantDescriptor {
    key: TenantKey::Cayman,
    display_name: "Cayman National",
    database_url_var: "CAYMAN_DATABASE_URL",
};

static BAHAMAS: TenantDescriptor = TenantDescriptor {
    key: TenantKey::Bahamas,
    display_name: "Bahamas Trust",
    database_url_var: "BAHAMAS_DATABASE_URL",
};

static BERMUDA: TenantDescriptor = TenantDescriptor {
    key: TenantKey::Bermuda,
    display_name: "Bermuda Commercial",
    database_url_var: "BERMUDA_DATABASE_URL",
};

static DESCRIPTORS: [&TenantDescriptor; 3] = [&CAYMAN, &BAHAMAS, &BERMUDA];

/// Process-wide tenant table. No registration at runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TenantRegistry;

impl TenantRegistry {
    /// Every tenant descriptor, in registry order.
    #[must_use]
    pub const fn all() -> &'static [&'static TenantDescriptor] {
        &DESCRIPTORS
    }

    #[must_use]
    pub const fn descriptor(key: TenantKey) -> &'static TenantDescriptor {
        match key {
            TenantKey::Cayman => &CAYMAN,
            TenantKey::Bahamas => &BAHAMAS,
            TenantKey::Bermuda => &BERMUDA,
        }
    }

    /// Look up a tenant by its string key.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::TenantNotFound` naming the key if it is not
    /// one of the registered tenants.
    pub fn lookup(key: &str) -> Result<&'static TenantDescriptor, RegistryError> {
        key.parse::<TenantKey>()
            .map(Self::descriptor)
            .map_err(|_| RegistryError::TenantNotFound(key.to_owned()))
    }

    #[must_use]
    pub const fn display_name(key: TenantKey) -> &'static str {
        Self::descriptor(key).display_name
    }
}
