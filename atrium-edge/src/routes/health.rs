//! Health Check Endpoint
//!
//! `GET /api/health`: liveness plus a summary of the tenant cache and block
//! registry. Never touches the tenant store.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::state::EdgeState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Serving, but no tenant mapping has loaded yet.
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantCacheHealth {
    pub hosts: usize,
    pub seconds_since_refresh: Option<u64>,
    pub hits: u64,
    pub misses: u64,
    pub refresh_failures: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub tenant_cache: TenantCacheHealth,
    pub block_types: usize,
}

pub async fn health(State(state): State<EdgeState>) -> Json<HealthResponse> {
    let stats = state.tenants.stats();
    let last_refresh = state.tenants.last_refreshed_at();
    let status = if last_refresh.is_some() {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        tenant_cache: TenantCacheHealth {
            hosts: state.tenants.len(),
            seconds_since_refresh: last_refresh.map(|at| at.elapsed().as_secs()),
            hits: stats.hits,
            misses: stats.misses,
            refresh_failures: stats.refresh_failures,
        },
        block_types: state.registry().len(),
    })
}
