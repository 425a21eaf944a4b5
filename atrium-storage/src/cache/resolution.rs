//! Hostname to tenant resolution with periodic full refresh.
//!
//! The edge calls [`TenantResolutionCache::resolve_fresh`] on every site
//! request. A refresh rebuilds the whole [`HostMap`] off to the side and swaps
//! it in only on success, so readers never see a half-built table and a
//! failing backend leaves the last good table in place.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use atrium_core::TenantRef;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::host_map::HostMap;
use crate::store::TenantStore;

/// Default time-to-live for a refreshed mapping.
pub const DEFAULT_TENANT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Configuration for the resolution cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantCacheConfig {
    /// A mapping older than this is refreshed before the next resolution.
    pub ttl: Duration,
}

impl Default for TenantCacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TENANT_CACHE_TTL,
        }
    }
}

impl TenantCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Counters describing cache traffic since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TenantCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub refreshes: u64,
    pub refresh_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    refreshes: AtomicU64,
    refresh_failures: AtomicU64,
}

#[derive(Debug)]
struct CacheState {
    hosts: Arc<HostMap>,
    refreshed_at: Option<Instant>,
}

/// Owned, injectable hostname resolution cache.
///
/// Each process holds its own instance; there is no cross-process
/// invalidation, so staleness is bounded by the TTL per process.
pub struct TenantResolutionCache {
    store: Arc<dyn TenantStore>,
    config: TenantCacheConfig,
    state: RwLock<CacheState>,
    counters: Counters,
}

impl TenantResolutionCache {
    /// Create an empty cache. The first [`refresh_if_due`](Self::refresh_if_due)
    /// always queries the store.
    pub fn new(store: Arc<dyn TenantStore>, config: TenantCacheConfig) -> Self {
        Self {
            store,
            config,
            state: RwLock::new(CacheState {
                hosts: Arc::new(HostMap::new()),
                refreshed_at: None,
            }),
            counters: Counters::default(),
        }
    }

    pub fn with_defaults(store: Arc<dyn TenantStore>) -> Self {
        Self::new(store, TenantCacheConfig::default())
    }

    pub fn config(&self) -> &TenantCacheConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TenantStore> {
        &self.store
    }

    // The state is only ever replaced wholesale, so a poisoned lock still
    // guards a consistent value.
    fn read_state(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Look a hostname up in the current mapping.
    ///
    /// The port is stripped and the host lowercased before an exact match.
    /// Never triggers a refresh.
    pub fn resolve(&self, host: &str) -> Option<TenantRef> {
        let hosts = self.snapshot();
        let found = hosts.get(host).cloned();
        let counter = if found.is_some() {
            &self.counters.hits
        } else {
            &self.counters.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Rebuild the mapping from the store.
    ///
    /// Returns the new mapping, or `None` when the store query failed. On
    /// failure the previous mapping stays in place.
    pub async fn refresh(&self) -> Option<Arc<HostMap>> {
        match self.store.list_domain_tenants().await {
            Ok(records) => {
                let hosts = Arc::new(HostMap::from_records(&records));
                {
                    let mut state = self.write_state();
                    state.hosts = Arc::clone(&hosts);
                    state.refreshed_at = Some(Instant::now());
                }
                self.counters.refreshes.fetch_add(1, Ordering::Relaxed);
                debug!(
                    tenants = records.len(),
                    hosts = hosts.len(),
                    "Tenant cache refreshed"
                );
                Some(hosts)
            }
            Err(err) => {
                self.counters.refresh_failures.fetch_add(1, Ordering::Relaxed);
                warn!(error = %err, "Tenant cache refresh failed, keeping last known mapping");
                None
            }
        }
    }

    /// Whether the next resolution should refresh first: the mapping is
    /// empty, was never refreshed, or is older than the TTL.
    pub fn is_refresh_due(&self) -> bool {
        let state = self.read_state();
        if state.hosts.is_empty() {
            return true;
        }
        match state.refreshed_at {
            Some(at) => at.elapsed() > self.config.ttl,
            None => true,
        }
    }

    /// Refresh only when due. Returns whether a refresh was attempted.
    pub async fn refresh_if_due(&self) -> bool {
        if !self.is_refresh_due() {
            return false;
        }
        self.refresh().await;
        true
    }

    /// The pipeline step: refresh if due, then resolve against whatever
    /// mapping is current, stale or not.
    pub async fn resolve_fresh(&self, host: &str) -> Option<TenantRef> {
        self.refresh_if_due().await;
        self.resolve(host)
    }

    /// The current mapping.
    pub fn snapshot(&self) -> Arc<HostMap> {
        Arc::clone(&self.read_state().hosts)
    }

    pub fn len(&self) -> usize {
        self.read_state().hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_state().hosts.is_empty()
    }

    /// When the last successful refresh completed.
    pub fn last_refreshed_at(&self) -> Option<Instant> {
        self.read_state().refreshed_at
    }

    pub fn stats(&self) -> TenantCacheStats {
        TenantCacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            refreshes: self.counters.refreshes.load(Ordering::Relaxed),
            refresh_failures: self.counters.refresh_failures.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for TenantResolutionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantResolutionCache")
            .field("config", &self.config)
            .field("hosts", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}
