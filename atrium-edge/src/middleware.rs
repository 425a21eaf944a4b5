//! Tenant Rewrite Middleware
//!
//! Maps the request hostname to a tenant and namespaces the path under the
//! tenant's slug, so `https://clinic.test/about` is served as
//! `/clinic/about`. Must wrap the whole router (not `Router::layer`) since
//! the rewrite has to happen before routing.
//!
//! Bypassed paths never touch the cache. A miss passes the request through
//! unchanged and leaves the outcome to downstream routing.

use axum::{
    extract::{Request, State},
    http::{
        header::{self, HeaderName},
        uri::PathAndQuery,
        HeaderValue, Uri,
    },
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use atrium_core::TenantRef;

use crate::state::EdgeState;

pub static TENANT_ID_HEADER: HeaderName = HeaderName::from_static("x-tenant-id");
pub static TENANT_SLUG_HEADER: HeaderName = HeaderName::from_static("x-tenant-slug");

/// Resolved tenant, inserted into request extensions on a hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub id: String,
    pub slug: String,
}

impl From<TenantRef> for TenantContext {
    fn from(tenant: TenantRef) -> Self {
        Self {
            id: tenant.id,
            slug: tenant.slug,
        }
    }
}

/// The request hostname: the `Host` header, else the URI authority.
pub fn request_host(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.as_str().to_string()))
        .filter(|host| !host.trim().is_empty())
}

/// `/<slug><path>`, query preserved.
pub fn namespaced_uri(uri: &Uri, slug: &str) -> Result<Uri, axum::http::Error> {
    let rewritten = match uri.query() {
        Some(query) => format!("/{}{}?{}", slug, uri.path(), query),
        None => format!("/{}{}", slug, uri.path()),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(rewritten)?);
    Ok(Uri::from_parts(parts)?)
}

/// Axum middleware for hostname-based tenant rewriting.
///
/// ```ignore
/// let app = Router::new()
///     .fallback_service(site_router)
///     .layer(middleware::from_fn_with_state(state.clone(), tenant_rewrite_middleware));
/// ```
pub async fn tenant_rewrite_middleware(
    State(state): State<EdgeState>,
    mut request: Request,
    next: Next,
) -> Response {
    if state.config.is_bypassed(request.uri().path()) {
        return next.run(request).await;
    }

    let Some(host) = request_host(&request) else {
        return next.run(request).await;
    };

    let Some(tenant) = state.resolve_host(&host).await else {
        debug!(host = %host, "No tenant for host, passing through");
        return next.run(request).await;
    };

    match namespaced_uri(request.uri(), &tenant.slug) {
        Ok(uri) => *request.uri_mut() = uri,
        Err(err) => {
            warn!(host = %host, slug = %tenant.slug, error = %err, "Cannot namespace path");
            return next.run(request).await;
        }
    }

    let context = TenantContext::from(tenant);
    let id_value = HeaderValue::from_str(&context.id).ok();
    let slug_value = HeaderValue::from_str(&context.slug).ok();
    request.extensions_mut().insert(context);

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    if let Some(value) = id_value {
        headers.insert(TENANT_ID_HEADER.clone(), value);
    }
    if let Some(value) = slug_value {
        headers.insert(TENANT_SLUG_HEADER.clone(), value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_namespaced_uri_keeps_query() {
        let uri: Uri = "/services/dental?page=2".parse().unwrap();
        let rewritten = namespaced_uri(&uri, "clinic").unwrap();
        assert_eq!(rewritten.path(), "/clinic/services/dental");
        assert_eq!(rewritten.query(), Some("page=2"));
    }

    #[test]
    fn test_namespaced_uri_root() {
        let uri: Uri = "/".parse().unwrap();
        assert_eq!(namespaced_uri(&uri, "clinic").unwrap().path(), "/clinic/");
    }

    #[test]
    fn test_namespaced_uri_absolute_form() {
        let uri: Uri = "http://clinic.test:3000/about".parse().unwrap();
        let rewritten = namespaced_uri(&uri, "clinic").unwrap();
        assert_eq!(rewritten.path(), "/clinic/about");
        assert_eq!(rewritten.authority().map(|a| a.as_str()), Some("clinic.test:3000"));
    }

    #[test]
    fn test_request_host_prefers_header() {
        let request = Request::builder()
            .uri("http://fallback.test/")
            .header(header::HOST, "clinic.test:3000")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request_host(&request).as_deref(), Some("clinic.test:3000"));

        let request = Request::builder()
            .uri("http://fallback.test/")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request_host(&request).as_deref(), Some("fallback.test"));

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(request_host(&request), None);
    }
}
