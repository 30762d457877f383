//! Metrics definitions for jwt-gate.
//!
//! All metrics follow Prometheus naming conventions:
//! - `jwt_gate_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 9 values max (standard methods plus `OTHER`)
//! - `status`: 3 values (success, error, timeout)
//! - `outcome`: 3 values (allowed, rejected, unprotected)
//! - `reason`: bounded by `AuthError` variants plus `none`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Proxied requests include upstream latency
        .set_buckets_for_metric(
            Matcher::Prefix("jwt_gate_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Signature verification is CPU-bound and sub-millisecond for Ed25519
        .set_buckets_for_metric(
            Matcher::Prefix("jwt_gate_token_validation".to_string()),
            &[
                0.0001, 0.00025, 0.0005, 0.001, 0.002, 0.005, 0.010, 0.025, 0.050,
            ],
        )
        .map_err(|e| format!("Failed to set token validation buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `jwt_gate_http_requests_total`, `jwt_gate_http_request_duration_seconds`
/// Labels: `method`, `status` / `status_code`
pub fn record_http_request(method: &str, status_code: u16, duration: Duration) {
    let method = normalize_method(method);
    let status = categorize_status_code(status_code);

    histogram!("jwt_gate_http_request_duration_seconds",
        "method" => method,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("jwt_gate_http_requests_total",
        "method" => method,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn normalize_method(method: &str) -> &'static str {
    match method {
        "GET" => "GET",
        "POST" => "POST",
        "PUT" => "PUT",
        "PATCH" => "PATCH",
        "DELETE" => "DELETE",
        "HEAD" => "HEAD",
        "OPTIONS" => "OPTIONS",
        "CONNECT" => "CONNECT",
        _ => "OTHER",
    }
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=399 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

// ============================================================================
// Gate Decision Metrics
// ============================================================================

/// Record the gate's decision for one request.
///
/// Metric: `jwt_gate_auth_decisions_total`
/// Labels: `outcome` (allowed, rejected, unprotected), `reason`
pub fn record_auth_decision(outcome: &'static str, reason: &'static str) {
    counter!("jwt_gate_auth_decisions_total",
        "outcome" => outcome,
        "reason" => reason
    )
    .increment(1);
}

/// Record how long token validation took.
///
/// Metric: `jwt_gate_token_validation_duration_seconds`
/// Labels: `status` (success, error)
pub fn record_token_validation(status: &'static str, duration: Duration) {
    histogram!("jwt_gate_token_validation_duration_seconds",
        "status" => status
    )
    .record(duration.as_secs_f64());
}
