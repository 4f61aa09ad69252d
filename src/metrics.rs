//! Request metrics exposed through the Prometheus scrape endpoint.
//!
//! The recorder is installed once at process start by [`init_metrics`]; the
//! returned handle travels through the application state and renders the
//! `/metrics` response. Increments go through the `metrics` facade, which is
//! atomic under arbitrary request concurrency.

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Per-endpoint request counter metric name.
pub const METRIC_API_REQUESTS: &str = "api_requests_total";

/// Install the process-wide Prometheus recorder.
///
/// Call this once at startup, before the listener binds. The returned handle
/// is the only way to read the counters back out.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_counter!(METRIC_API_REQUESTS, "Total API requests by endpoint");
    Ok(handle)
}

/// Count one request against `endpoint`, whatever its outcome.
pub fn inc_endpoint_request(endpoint: &'static str) {
    counter!(METRIC_API_REQUESTS, "endpoint" => endpoint).increment(1);
}
