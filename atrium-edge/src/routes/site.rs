//! Site fallback.
//!
//! Page rendering lives outside this service. Rewritten requests land here
//! as `/<slug>/...` and get a JSON description of the namespace a renderer
//! would serve; anything else is a plain 404.

use axum::{
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::middleware::TenantContext;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SitePage {
    pub tenant: TenantContext,
    /// `/<slug>`
    pub namespace: String,
    /// Path inside the tenant's site, always starting with `/`.
    pub path: String,
}

/// Split a rewritten path into the tenant-relative part.
fn site_path(full: &str, slug: &str) -> String {
    let rest = full
        .strip_prefix('/')
        .and_then(|p| p.strip_prefix(slug))
        .filter(|rest| rest.is_empty() || rest.starts_with('/'))
        .unwrap_or(full);
    if rest.is_empty() {
        "/".to_string()
    } else {
        rest.to_string()
    }
}

pub async fn site_handler(tenant: Option<Extension<TenantContext>>, uri: Uri) -> Response {
    match tenant {
        Some(Extension(tenant)) => {
            let path = site_path(uri.path(), &tenant.slug);
            let page = SitePage {
                namespace: format!("/{}", tenant.slug),
                path,
                tenant,
            };
            Json(page).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
