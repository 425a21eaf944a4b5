//! Tenant Resolution Endpoints

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use atrium_core::{hostname, TenantRecord, TenantRef};

use crate::error::{ApiError, ApiResult};
use crate::state::EdgeState;

#[derive(Debug, Clone, Deserialize)]
pub struct ResolveParams {
    pub host: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolveResponse {
    /// Normalized host that was looked up.
    pub host: String,
    pub tenant: TenantRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshResponse {
    pub hosts: usize,
}

/// GET /api/tenants/resolve?host=
pub async fn resolve(
    State(state): State<EdgeState>,
    Query(params): Query<ResolveParams>,
) -> ApiResult<Json<ResolveResponse>> {
    let host = params
        .host
        .filter(|h| !h.trim().is_empty())
        .ok_or_else(|| ApiError::missing_field("host"))?;

    let tenant = state
        .resolve_host(&host)
        .await
        .ok_or_else(|| ApiError::tenant_not_found(&host))?;

    Ok(Json(ResolveResponse {
        host: hostname::normalize_host(&host),
        tenant,
    }))
}

/// POST /api/tenants/refresh
pub async fn refresh(State(state): State<EdgeState>) -> ApiResult<Json<RefreshResponse>> {
    let hosts = state
        .refresh_tenants()
        .await
        .ok_or_else(|| ApiError::service_unavailable("Tenant store refresh failed"))?;
    Ok(Json(RefreshResponse { hosts: hosts.len() }))
}

/// GET /api/tenants/:slug, read straight from the store.
pub async fn get_by_slug(
    State(state): State<EdgeState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<TenantRecord>> {
    let record = state
        .store()
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::tenant_not_found(&slug))?;
    Ok(Json(record))
}

pub fn create_router() -> Router<EdgeState> {
    Router::new()
        .route("/resolve", get(resolve))
        .route("/refresh", post(refresh))
        .route("/:slug", get(get_by_slug))
}
