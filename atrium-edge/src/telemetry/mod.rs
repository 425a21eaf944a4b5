//! Atrium Telemetry - Observability Infrastructure
//!
//! Structured logging through `tracing` and Prometheus metrics for the edge.

pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metrics::{metrics_handler, EdgeMetrics, METRICS};
pub use middleware::observability_middleware;
pub use tracer::{init_tracing, TelemetryConfig};
