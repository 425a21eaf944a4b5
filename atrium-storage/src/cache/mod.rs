//! Tenant resolution cache.
//!
//! Maps inbound hostnames to tenants. The mapping is a full snapshot of all
//! domain-bearing tenants, rebuilt when it is empty or older than the TTL
//! (five minutes by default).
//!
//! # Example
//!
//! ```ignore
//! let cache = TenantResolutionCache::with_defaults(store);
//!
//! // Edge pipeline step: refresh if due, then look up.
//! if let Some(tenant) = cache.resolve_fresh("www.clinic.test:443").await {
//!     rewrite_under(&tenant.slug);
//! }
//! ```

pub mod host_map;
pub mod resolution;

pub use host_map::HostMap;
pub use resolution::{
    TenantCacheConfig, TenantCacheStats, TenantResolutionCache, DEFAULT_TENANT_CACHE_TTL,
};
