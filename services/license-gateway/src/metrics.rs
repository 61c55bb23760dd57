//! Prometheus metrics exposition
//!
//! - `license_requests_total` (counter): labels `endpoint`, `status`
//! - `license_request_duration_seconds` (histogram): label `endpoint`
//! - `license_stage_errors_total` (counter): label `stage`

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

const DURATION_BUCKETS: &[f64] = &[
    0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0,
];

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// A full license flow spans token acquisition, a recovery grace period and
/// up to three 10s retry backoffs, so the duration buckets run all the way to
/// the ten-minute client timeout rather than stopping at typical
/// request-latency ranges.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full(
                "license_request_duration_seconds".to_string(),
            ),
            DURATION_BUCKETS,
        )
        .expect("failed to set histogram buckets")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record a completed license request with endpoint and outcome labels.
pub fn record_request(endpoint: &str, status: u16, duration_secs: f64) {
    metrics::counter!(
        "license_requests_total",
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "license_request_duration_seconds",
        "endpoint" => endpoint.to_string()
    )
    .record(duration_secs);
}

/// Record a pipeline failure with the stage that produced it.
pub fn record_stage_error(stage: &str) {
    metrics::counter!("license_stage_errors_total", "stage" => stage.to_string()).increment(1);
}
