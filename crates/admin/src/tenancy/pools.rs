use std::collections::BTreeMap;
use std::sync::Arc;

use bankdesk_core::TenantKey;

use super::RegistryError;
use crate::config::TenantConnection;
use crate::db::{self, PgSupportStore, SupportStore};

/// One store per tenant, keyed by tenant.
///
/// Cloning is cheap; clones share the same stores.
#[derive(Clone, Default)]
pub struct TenantPools {
    stores: BTreeMap<TenantKey, Arc<dyn SupportStore>>,
}

impl std::fmt::Debug for TenantPools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantPools")
            .field("tenants", &self.stores.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TenantPools {
    /// Build `PostgreSQL` stores that connect on first use.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if a connection string cannot be parsed.
    pub fn connect_lazy(connections: &[TenantConnection]) -> Result<Self, sqlx::Error> {
        let mut stores: BTreeMap<TenantKey, Arc<dyn SupportStore>> = BTreeMap::new();
        for connection in connections {
            let pool = db::create_lazy_pool(&connection.database_url)?;
            stores.insert(
                connection.key,
                Arc::new(PgSupportStore::new(connection.key, pool)),
            );
        }
        Ok(Self { stores })
    }

    /// Use already-built stores, keyed by the tenant each reports.
    #[must_use]
    pub fn from_stores(stores: impl IntoIterator<Item = Arc<dyn SupportStore>>) -> Self {
        Self {
            stores: stores.into_iter().map(|s| (s.tenant(), s)).collect(),
        }
    }

    /// The store owning `key`'s records.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::MissingConnection` if no store was configured
    /// for the tenant.
    pub fn store(&self, key: TenantKey) -> Result<&Arc<dyn SupportStore>, RegistryError> {
        self.stores
            .get(&key)
            .ok_or(RegistryError::MissingConnection(key))
    }

    /// Configured stores, in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (TenantKey, &Arc<dyn SupportStore>)> {
        self.stores.iter().map(|(k, s)| (*k, s))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Close every store's connections.
    pub async fn close(&self) {
        for store in self.stores.values() {
            store.close().await;
        }
    }
}
