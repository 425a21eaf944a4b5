//! Axum Middleware for HTTP Request Metrics
//!
//! Records a Prometheus counter and latency sample per request and logs the
//! completion. Paths are labelled by matched route; site paths share one
//! label so tenant slugs never become label values.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use super::metrics::METRICS;

/// Label used for every request that fell through to the site handler.
pub const SITE_ROUTE_LABEL: &str = "/{site}";

fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| SITE_ROUTE_LABEL.to_string())
}

/// Observability middleware, installed with `Router::layer` so the matched
/// route is known.
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let route = route_label(&request);

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_http_request(
            method.as_str(),
            &route,
            status.as_u16(),
            duration.as_secs_f64(),
        );
    }

    tracing::info!(
        method = %method,
        path = %path,
        route = %route,
        status = status.as_u16(),
        duration_ms = duration.as_millis() as u64,
        "Request completed"
    );

    response
}
