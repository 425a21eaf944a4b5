//! Block Migration Endpoints
//!
//! Read-time migration for page documents. Nothing here writes back to
//! storage; callers get the migrated blocks and decide what to persist.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use atrium_blocks::{BlockDescriptor, MigrationOutcome};
use atrium_core::BlockInstance;

use crate::error::ApiResult;
use crate::state::EdgeState;

#[derive(Debug, Clone, Deserialize)]
pub struct BlocksRequest {
    pub blocks: Vec<BlockInstance>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrateResponse {
    pub blocks: Vec<BlockInstance>,
    /// One entry per input block, same order.
    pub outcomes: Vec<MigrationOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockValidity {
    pub block_type: String,
    pub valid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub results: Vec<BlockValidity>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockTypeSummary {
    pub block_type: String,
    pub label: String,
    pub current_version: String,
    pub version_history: Vec<String>,
    pub migrations: Vec<String>,
}

impl From<&BlockDescriptor> for BlockTypeSummary {
    fn from(descriptor: &BlockDescriptor) -> Self {
        Self {
            block_type: descriptor.block_type.clone(),
            label: descriptor.label.clone(),
            current_version: descriptor.current_version.to_string(),
            version_history: descriptor
                .version_history
                .iter()
                .map(ToString::to_string)
                .collect(),
            migrations: descriptor
                .migrations
                .keys()
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryResponse {
    pub block_types: Vec<BlockTypeSummary>,
}

/// POST /api/blocks/migrate
pub async fn migrate(
    State(state): State<EdgeState>,
    Json(request): Json<BlocksRequest>,
) -> ApiResult<Json<MigrateResponse>> {
    let (blocks, outcomes): (Vec<_>, Vec<_>) = request
        .blocks
        .iter()
        .map(|block| state.migrate_block(block))
        .unzip();
    Ok(Json(MigrateResponse { blocks, outcomes }))
}

/// POST /api/blocks/validate
pub async fn validate(
    State(state): State<EdgeState>,
    Json(request): Json<BlocksRequest>,
) -> ApiResult<Json<ValidateResponse>> {
    let results = request
        .blocks
        .iter()
        .map(|block| BlockValidity {
            block_type: block.block_type.clone(),
            valid: state.migrator.validate_block(block),
        })
        .collect();
    Ok(Json(ValidateResponse { results }))
}

/// GET /api/blocks/registry
pub async fn registry(State(state): State<EdgeState>) -> Json<RegistryResponse> {
    Json(RegistryResponse {
        block_types: state
            .registry()
            .descriptors()
            .map(BlockTypeSummary::from)
            .collect(),
    })
}

pub fn create_router() -> Router<EdgeState> {
    Router::new()
        .route("/migrate", post(migrate))
        .route("/validate", post(validate))
        .route("/registry", get(registry))
}
