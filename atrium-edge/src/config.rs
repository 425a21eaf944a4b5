//! Edge Configuration Module
//!
//! Settings for the tenant cache, the rewrite middleware and the HTTP
//! listener. Loaded from environment variables with development defaults.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use atrium_blocks::MissingLinkPolicy;
use atrium_core::ConfigError;
use atrium_storage::{TenantCacheConfig, DEFAULT_TENANT_CACHE_TTL};

/// Path prefixes that never go through tenant resolution.
pub const DEFAULT_BYPASS_PREFIXES: &[&str] = &["/api", "/admin", "/_next", "/static", "/media"];

/// Which tenant store backs the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TenantStoreKind {
    #[default]
    Postgres,
    /// Empty in-memory store, for local runs without a database.
    Memory,
}

impl FromStr for TenantStoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(TenantStoreKind::Postgres),
            "memory" => Ok(TenantStoreKind::Memory),
            other => Err(ConfigError::InvalidValue {
                field: "ATRIUM_TENANT_STORE".to_string(),
                value: other.to_string(),
                reason: "expected postgres or memory".to_string(),
            }),
        }
    }
}

// ============================================================================
// EDGE CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct EdgeConfig {
    /// Tenant mapping time-to-live.
    pub tenant_cache_ttl: Duration,

    /// Paths under these prefixes skip tenant resolution.
    pub bypass_prefixes: Vec<String>,

    pub missing_link_policy: MissingLinkPolicy,

    pub bind_host: String,
    pub port: u16,

    pub tenant_store: TenantStoreKind,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            tenant_cache_ttl: DEFAULT_TENANT_CACHE_TTL,
            bypass_prefixes: DEFAULT_BYPASS_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            missing_link_policy: MissingLinkPolicy::default(),
            bind_host: "0.0.0.0".to_string(),
            port: 3000,
            tenant_store: TenantStoreKind::default(),
        }
    }
}

impl EdgeConfig {
    /// Create EdgeConfig from environment variables.
    ///
    /// Environment variables:
    /// - `ATRIUM_TENANT_CACHE_TTL_SECS`: Mapping TTL in seconds (default: 300)
    /// - `ATRIUM_BYPASS_PREFIXES`: Comma-separated path prefixes (default: /api,/admin,/_next,/static,/media)
    /// - `ATRIUM_MISSING_LINK_POLICY`: "skip" or "fail" (default: skip)
    /// - `ATRIUM_API_BIND`: Listen address (default: 0.0.0.0)
    /// - `PORT` or `ATRIUM_API_PORT`: Listen port (default: 3000)
    /// - `ATRIUM_TENANT_STORE`: "postgres" or "memory" (default: postgres)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let tenant_cache_ttl = match std::env::var("ATRIUM_TENANT_CACHE_TTL_SECS") {
            Ok(raw) => Duration::from_secs(raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::InvalidValue {
                    field: "ATRIUM_TENANT_CACHE_TTL_SECS".to_string(),
                    value: raw.clone(),
                    reason: "expected whole seconds".to_string(),
                }
            })?),
            Err(_) => defaults.tenant_cache_ttl,
        };

        let bypass_prefixes = std::env::var("ATRIUM_BYPASS_PREFIXES")
            .ok()
            .map(|s| parse_prefixes(&s))
            .unwrap_or(defaults.bypass_prefixes);

        let missing_link_policy = match std::env::var("ATRIUM_MISSING_LINK_POLICY") {
            Ok(raw) => raw.parse::<MissingLinkPolicy>().map_err(|reason| ConfigError::InvalidValue {
                field: "ATRIUM_MISSING_LINK_POLICY".to_string(),
                value: raw.clone(),
                reason,
            })?,
            Err(_) => defaults.missing_link_policy,
        };

        let bind_host = std::env::var("ATRIUM_API_BIND").unwrap_or(defaults.bind_host);

        let port = match std::env::var("PORT").or_else(|_| std::env::var("ATRIUM_API_PORT")) {
            Ok(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                field: "PORT".to_string(),
                value: raw.clone(),
                reason: "expected a port number".to_string(),
            })?,
            Err(_) => defaults.port,
        };

        let tenant_store = match std::env::var("ATRIUM_TENANT_STORE") {
            Ok(raw) => raw.parse::<TenantStoreKind>()?,
            Err(_) => defaults.tenant_store,
        };

        Ok(Self {
            tenant_cache_ttl,
            bypass_prefixes,
            missing_link_policy,
            bind_host,
            port,
            tenant_store,
        })
    }

    pub fn cache_config(&self) -> TenantCacheConfig {
        TenantCacheConfig::new().with_ttl(self.tenant_cache_ttl)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>().map_err(|e| ConfigError::InvalidValue {
            field: "ATRIUM_API_BIND".to_string(),
            value: addr.clone(),
            reason: format!("{}", e),
        })
    }

    /// Whether `path` skips tenant resolution: under a bypass prefix, or a
    /// static asset (last segment has a file extension).
    pub fn is_bypassed(&self, path: &str) -> bool {
        let under_prefix = self.bypass_prefixes.iter().any(|prefix| {
            path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        });
        under_prefix || has_file_extension(path)
    }
}

/// Split a comma list into normalized `/prefix` entries.
fn parse_prefixes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| p.trim().trim_end_matches('/'))
        .filter(|p| !p.is_empty())
        .map(|p| {
            if p.starts_with('/') {
                p.to_string()
            } else {
                format!("/{}", p)
            }
        })
        .collect()
}

fn has_file_extension(path: &str) -> bool {
    let last = path.rsplit('/').next().unwrap_or("");
    match last.rsplit_once('.') {
        Some((stem, ext)) => {
            !stem.is_empty() && !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}
