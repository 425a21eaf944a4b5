//! Edge Routes Module
//!
//! Includes:
//! - Health check (`/api/health`)
//! - Tenant resolution (`/api/tenants`)
//! - Block migration and registry (`/api/blocks`)
//! - Prometheus scrape endpoint (`/metrics`)
//! - Site fallback for rewritten tenant paths

pub mod blocks;
pub mod health;
pub mod site;
pub mod tenants;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::tenant_rewrite_middleware;
use crate::state::EdgeState;
use crate::telemetry::{metrics_handler, observability_middleware};

pub use blocks::create_router as blocks_router;
pub use tenants::create_router as tenants_router;

/// Build the full edge application.
///
/// Layer order, outer to inner:
/// 1. HTTP tracing
/// 2. Tenant rewrite (runs before routing, so rewritten paths hit the
///    site fallback)
/// 3. Observability metrics, recorded against matched route templates
/// 4. Routes
///
/// `/metrics` is mounted outside the rewrite so a scrape through a tenant
/// hostname is never namespaced.
pub fn create_router(state: EdgeState, metrics_enabled: bool) -> Router {
    let mut routes = Router::new()
        .route("/api/health", get(health::health))
        .nest("/api/tenants", tenants::create_router())
        .nest("/api/blocks", blocks::create_router())
        .fallback(site::site_handler)
        .with_state(state.clone());

    if metrics_enabled {
        routes = routes.layer(from_fn(observability_middleware));
    }

    let mut app = Router::new()
        .fallback_service(routes)
        .layer(from_fn_with_state(state, tenant_rewrite_middleware));

    if metrics_enabled {
        app = app.route("/metrics", get(metrics_handler));
    }

    app.layer(TraceLayer::new_for_http())
}
