//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use atrium_blocks::{BlockMigrator, BlockRegistry, MigrationOutcome};
use atrium_core::{BlockInstance, TenantRef};
use atrium_storage::{HostMap, TenantResolutionCache, TenantStore};

use crate::config::EdgeConfig;
use crate::telemetry::METRICS;

/// Application-wide state shared by the middleware and every route.
#[derive(Clone)]
pub struct EdgeState {
    /// Hostname resolution cache; owns the tenant store handle.
    pub tenants: Arc<TenantResolutionCache>,
    pub migrator: Arc<BlockMigrator>,
    pub config: Arc<EdgeConfig>,
    pub start_time: Instant,
}

impl EdgeState {
    pub fn new(
        tenants: Arc<TenantResolutionCache>,
        migrator: Arc<BlockMigrator>,
        config: EdgeConfig,
    ) -> Self {
        Self {
            tenants,
            migrator,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Wire a store and registry together using `config` for the cache TTL
    /// and the missing-link policy.
    pub fn build(store: Arc<dyn TenantStore>, registry: Arc<BlockRegistry>, config: EdgeConfig) -> Self {
        let tenants = Arc::new(TenantResolutionCache::new(store, config.cache_config()));
        let migrator = Arc::new(BlockMigrator::new(registry).with_policy(config.missing_link_policy));
        Self::new(tenants, migrator, config)
    }

    pub fn store(&self) -> &Arc<dyn TenantStore> {
        self.tenants.store()
    }

    pub fn registry(&self) -> &Arc<BlockRegistry> {
        self.migrator.registry()
    }

    /// Refresh the mapping if due, then resolve. A failed refresh is logged
    /// by the cache and the current mapping is used.
    pub async fn resolve_host(&self, host: &str) -> Option<TenantRef> {
        if self.tenants.is_refresh_due() {
            self.refresh_tenants().await;
        }
        let found = self.tenants.resolve(host);
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_resolution(found.is_some());
        }
        found
    }

    /// Force a refresh. `None` when the store query failed.
    pub async fn refresh_tenants(&self) -> Option<Arc<HostMap>> {
        let refreshed = self.tenants.refresh().await;
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_refresh(refreshed.is_some());
        }
        refreshed
    }

    pub fn migrate_block(&self, instance: &BlockInstance) -> (BlockInstance, MigrationOutcome) {
        let (migrated, outcome) = self.migrator.migrate_with_outcome(instance);
        if let Ok(metrics) = METRICS.as_ref() {
            // Unregistered types share one label.
            let block_type = match outcome {
                MigrationOutcome::UnknownType => "unknown",
                _ => instance.block_type.as_str(),
            };
            metrics.record_migration(block_type, outcome.as_str());
        }
        (migrated, outcome)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl std::fmt::Debug for EdgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeState")
            .field("tenants", &self.tenants)
            .field("migrator", &self.migrator)
            .field("config", &self.config)
            .finish()
    }
}
