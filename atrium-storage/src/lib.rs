//! Atrium Storage - Tenant Store and Resolution Cache
//!
//! Defines the [`TenantStore`] seam in front of the document database, an
//! in-memory implementation, and the hostname resolution cache the edge
//! consults on every site request.

pub mod cache;
pub mod store;

pub use cache::{
    HostMap, TenantCacheConfig, TenantCacheStats, TenantResolutionCache,
    DEFAULT_TENANT_CACHE_TTL,
};
pub use store::{InMemoryTenantStore, TenantStore};
