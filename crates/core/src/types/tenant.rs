//! Tenant keys for the three isolated institutional stores.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a known tenant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown tenant: {0}")]
pub struct UnknownTenant(pub String);

/// Key of one institutional tenant.
///
/// The set of tenants is fixed at compile time. Each tenant has its own
/// store and its own ID sequences; records never reference another
/// tenant's rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantKey {
    Cayman,
    Bahamas,
    Bermuda,
}

impl TenantKey {
    /// Every tenant, in registry order.
    pub const ALL: [Self; 3] = [Self::Cayman, Self::Bahamas, Self::Bermuda];

    /// Stable string form used in URLs, logs, and configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cayman => "cayman",
            Self::Bahamas => "bahamas",
            Self::Bermuda => "bermuda",
        }
    }

    /// Position of this tenant in [`TenantKey::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Cayman => 0,
            Self::Bahamas => 1,
            Self::Bermuda => 2,
        }
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TenantKey {
    type Err = UnknownTenant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cayman" => Ok(Self::Cayman),
            "bahamas" => Ok(Self::Bahamas),
            "bermuda" => Ok(Self::Bermuda),
            _ => Err(UnknownTenant(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_tenants() {
        for key in TenantKey::ALL {
            assert_eq!(key.as_str().parse::<TenantKey>(), Ok(key));
        }
        assert_eq!(" Cayman ".parse::<TenantKey>(), Ok(TenantKey::Cayman));
    }

    #[test]
    fn test_parse_unknown_tenant() {
        let err = "jersey".parse::<TenantKey>().unwrap_err();
        assert_eq!(err, UnknownTenant("jersey".to_string()));
        assert_eq!(err.to_string(), "unknown tenant: jersey");
    }

    #[test]
    fn test_index_matches_all_order() {
        for (i, key) in TenantKey::ALL.iter().enumerate() {
            assert_eq!(key.index(), i);
        }
    }
}
