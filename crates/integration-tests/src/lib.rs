//! Integration tests for Bankdesk.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory scenarios
//! cargo test -p bankdesk-integration-tests
//!
//! # Postgres-backed store tests (needs a migrated scratch database)
//! TEST_DATABASE_URL=postgres://... cargo test -p bankdesk-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `access_resolution` - Who sees which end users
//! - `inbox_aggregation` - Ordering and partial-failure behavior across tenants
//! - `mutations` - Close, delete, and read-state guarantees
//! - `support_scenario` - A manager working a Cayman session end to end
//! - `postgres_store` - The `sqlx` store against a real database

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use bankdesk_admin::db::{MemoryStore, SupportStore};
use bankdesk_admin::models::{NewHierarchyEdge, UserRecord};
use bankdesk_admin::services::{InboxAggregator, MutationGateway, ThreadSync};
use bankdesk_admin::tenancy::TenantPools;
use bankdesk_core::{RelationKind, RoleFlags, TenantKey};

pub const ADMIN: RoleFlags = RoleFlags {
    is_admin: true,
    is_manager: false,
    is_superior_manager: false,
};

pub const MANAGER: RoleFlags = RoleFlags {
    is_admin: false,
    is_manager: true,
    is_superior_manager: false,
};

pub const SUPERIOR_MANAGER: RoleFlags = RoleFlags {
    is_admin: false,
    is_manager: false,
    is_superior_manager: true,
};

pub const CLIENT: RoleFlags = RoleFlags {
    is_admin: false,
    is_manager: false,
    is_superior_manager: false,
};

/// Three in-memory tenants wired into one set of pools.
pub struct Desk {
    stores: Vec<Arc<MemoryStore>>,
    pools: TenantPools,
}

impl Default for Desk {
    fn default() -> Self {
        Self::new()
    }
}

impl Desk {
    #[must_use]
    pub fn new() -> Self {
        let stores: Vec<Arc<MemoryStore>> = TenantKey::ALL
            .iter()
            .map(|key| Arc::new(MemoryStore::new(*key)))
            .collect();
        let pools = TenantPools::from_stores(
            stores
                .iter()
                .map(|s| Arc::clone(s) as Arc<dyn SupportStore>),
        );
        Self { stores, pools }
    }

    /// # Panics
    ///
    /// Never: every registered tenant has a store.
    #[must_use]
    pub fn store(&self, key: TenantKey) -> &MemoryStore {
        self.stores
            .get(key.index())
            .map(AsRef::as_ref)
            .unwrap_or_else(|| panic!("no store for {key}"))
    }

    #[must_use]
    pub fn stores(&self) -> &[Arc<MemoryStore>] {
        &self.stores
    }

    #[must_use]
    pub fn pools(&self) -> TenantPools {
        self.pools.clone()
    }

    #[must_use]
    pub fn aggregator(&self) -> InboxAggregator {
        InboxAggregator::new(self.pools())
    }

    #[must_use]
    pub fn gateway(&self) -> MutationGateway {
        MutationGateway::new(self.pools())
    }

    #[must_use]
    pub fn thread(&self) -> ThreadSync {
        ThreadSync::new(self.pools())
    }

    /// # Panics
    ///
    /// Panics if the store refuses the insert.
    #[must_use]
    pub fn user(&self, key: TenantKey, name: &str, roles: RoleFlags) -> UserRecord {
        self.store(key)
            .add_user(name, None, roles)
            .unwrap_or_else(|e| panic!("add user {name}: {e}"))
    }

    /// # Panics
    ///
    /// Panics if the store refuses the edge.
    pub async fn edge(
        &self,
        key: TenantKey,
        superior: &UserRecord,
        subordinate: &UserRecord,
        kind: RelationKind,
    ) {
        self.store(key)
            .insert_edge(&NewHierarchyEdge {
                superior_id: superior.id,
                subordinate_id: subordinate.id,
                kind,
            })
            .await
            .unwrap_or_else(|e| panic!("insert edge: {e}"));
    }

    /// Total store operations across every tenant.
    #[must_use]
    pub fn operations(&self) -> u64 {
        self.stores.iter().map(|s| s.operations()).sum()
    }
}

/// A fixed instant on the test day, `minute` minutes past nine.
///
/// # Panics
///
/// Panics if `minute` is 60 or more.
#[must_use]
pub fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, minute, 0)
        .single()
        .unwrap_or_else(|| panic!("invalid minute {minute}"))
}
