//! Atrium Edge Server Entry Point
//!
//! Bootstraps configuration, connects the tenant store, warms the tenant
//! cache and starts the Axum HTTP server.

use std::sync::Arc;

use atrium_blocks::default_registry;
use atrium_edge::telemetry::{init_tracing, TelemetryConfig};
use atrium_edge::{
    create_router, ApiError, ApiResult, DbConfig, EdgeConfig, EdgeState, PgTenantStore,
    TenantStoreKind,
};
use atrium_storage::{InMemoryTenantStore, TenantStore};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracing(&telemetry_config)?;

    let config = EdgeConfig::from_env()
        .map_err(|e| ApiError::internal_error(format!("Invalid configuration: {}", e)))?;

    let store: Arc<dyn TenantStore> = match config.tenant_store {
        TenantStoreKind::Postgres => {
            let store = PgTenantStore::from_config(&DbConfig::from_env())?;
            store.ensure_schema().await?;
            Arc::new(store)
        }
        TenantStoreKind::Memory => {
            tracing::warn!("Using empty in-memory tenant store");
            Arc::new(InMemoryTenantStore::new())
        }
    };

    let registry = Arc::new(default_registry().map_err(|e| {
        ApiError::registry_error(format!("Failed to build block registry: {}", e))
    })?);

    let addr = config
        .bind_addr()
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    let state = EdgeState::build(store, registry, config);
    match state.refresh_tenants().await {
        Some(hosts) => tracing::info!(hosts = hosts.len(), "Tenant cache warmed"),
        None => tracing::warn!("Initial tenant refresh failed, serving with an empty mapping"),
    }

    let app = create_router(state, telemetry_config.metrics_enabled);

    tracing::info!(%addr, "Starting Atrium edge server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
