//! Prometheus Metrics Definitions
//!
//! Defines the edge metrics and the /metrics endpoint for scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec,
    TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Database operation latency buckets (seconds)
const DB_LATENCY_BUCKETS: &[f64] =
    &[0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<EdgeMetrics>> = Lazy::new(EdgeMetrics::new);

/// Container for all edge metrics.
#[derive(Clone)]
pub struct EdgeMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Hostname resolutions - labels: result (hit/miss)
    pub tenant_resolutions_total: CounterVec,

    /// Tenant mapping refreshes - labels: status (success/failure)
    pub tenant_refreshes_total: CounterVec,

    /// Block migrations - labels: block_type, outcome
    pub block_migrations_total: CounterVec,

    /// Tenant store operations - labels: operation, entity, status
    pub db_operations_total: CounterVec,

    /// Tenant store operation duration - labels: operation, entity
    pub db_operation_duration_seconds: HistogramVec,
}

fn registration_error(name: &str, err: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, err))
}

impl EdgeMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "atrium_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration_error("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "atrium_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("http_request_duration_seconds", e))?,

            tenant_resolutions_total: register_counter_vec!(
                "atrium_tenant_resolutions_total",
                "Hostname to tenant resolutions",
                &["result"]
            )
            .map_err(|e| registration_error("tenant_resolutions_total", e))?,

            tenant_refreshes_total: register_counter_vec!(
                "atrium_tenant_refreshes_total",
                "Tenant mapping refresh attempts",
                &["status"]
            )
            .map_err(|e| registration_error("tenant_refreshes_total", e))?,

            block_migrations_total: register_counter_vec!(
                "atrium_block_migrations_total",
                "Block instances run through the migration engine",
                &["block_type", "outcome"]
            )
            .map_err(|e| registration_error("block_migrations_total", e))?,

            db_operations_total: register_counter_vec!(
                "atrium_db_operations_total",
                "Total number of database operations",
                &["operation", "entity", "status"]
            )
            .map_err(|e| registration_error("db_operations_total", e))?,

            db_operation_duration_seconds: register_histogram_vec!(
                "atrium_db_operation_duration_seconds",
                "Database operation duration in seconds",
                &["operation", "entity"],
                DB_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("db_operation_duration_seconds", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, status_str.as_str()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    pub fn record_resolution(&self, hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        self.tenant_resolutions_total
            .with_label_values(&[result])
            .inc();
    }

    pub fn record_refresh(&self, success: bool) {
        let status = if success { "success" } else { "failure" };
        self.tenant_refreshes_total.with_label_values(&[status]).inc();
    }

    pub fn record_migration(&self, block_type: &str, outcome: &str) {
        self.block_migrations_total
            .with_label_values(&[block_type, outcome])
            .inc();
    }

    /// Record a database operation.
    pub fn record_db_operation(
        &self,
        operation: &str,
        entity: &str,
        success: bool,
        duration_secs: f64,
    ) {
        let status = if success { "success" } else { "error" };
        self.db_operations_total
            .with_label_values(&[operation, entity, status])
            .inc();
        self.db_operation_duration_seconds
            .with_label_values(&[operation, entity])
            .observe(duration_secs);
    }
}

/// Handler for GET /metrics. Returns Prometheus text format.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
