//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::SupportConfig;
use crate::services::{HierarchyAdmin, InboxAggregator, MutationGateway, OpenViews, SyncConfig};
use crate::tenancy::TenantPools;

/// Application state shared across all handlers.
///
/// Cheap to clone; all clones share the same tenant stores.
#[derive(Debug, Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

#[derive(Debug)]
struct AppStateInner {
    pools: TenantPools,
    sync: SyncConfig,
    staff_name: String,
    views: OpenViews,
}

impl AppState {
    #[must_use]
    pub fn new(pools: TenantPools, support: &SupportConfig) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                pools,
                sync: SyncConfig::from(support),
                staff_name: support.staff_name.clone(),
                views: OpenViews::new(),
            }),
        }
    }

    #[must_use]
    pub fn pools(&self) -> &TenantPools {
        &self.inner.pools
    }

    #[must_use]
    pub fn sync_config(&self) -> SyncConfig {
        self.inner.sync
    }

    /// Sender name used when the staff record has none.
    #[must_use]
    pub fn staff_name(&self) -> &str {
        &self.inner.staff_name
    }

    /// Streaming views that writes must resync.
    #[must_use]
    pub fn views(&self) -> &OpenViews {
        &self.inner.views
    }

    #[must_use]
    pub fn aggregator(&self) -> InboxAggregator {
        InboxAggregator::new(self.inner.pools.clone())
    }

    #[must_use]
    pub fn gateway(&self) -> MutationGateway {
        MutationGateway::new(self.inner.pools.clone())
    }

    #[must_use]
    pub fn hierarchy(&self) -> HierarchyAdmin {
        HierarchyAdmin::new(self.inner.pools.clone())
    }
}
