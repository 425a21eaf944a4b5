//! Atrium Edge - HTTP Layer
//!
//! Fronts every customer site served by the platform. Incoming requests are
//! mapped from hostname to tenant and rewritten into the tenant's path
//! namespace; the `/api` surface exposes tenant resolution and the block
//! migration engine.
//!
//! Tenants are read from PostgreSQL through [`PgTenantStore`] (or an
//! in-memory store for local runs) and cached per process by
//! [`atrium_storage::TenantResolutionCache`].

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use config::{EdgeConfig, TenantStoreKind, DEFAULT_BYPASS_PREFIXES};
pub use db::{DbConfig, PgTenantStore};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{
    namespaced_uri, request_host, tenant_rewrite_middleware, TenantContext, TENANT_ID_HEADER,
    TENANT_SLUG_HEADER,
};
pub use routes::create_router;
pub use state::EdgeState;
