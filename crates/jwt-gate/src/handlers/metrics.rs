//! Prometheus metrics endpoint handler.
//!
//! # Security
//!
//! Served on the admin listener only. No claim values, tokens or key ids
//! appear in metrics; labels are bounded.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// Returns Prometheus-formatted metrics for scraping:
/// ```text
/// # TYPE jwt_gate_auth_decisions_total counter
/// jwt_gate_auth_decisions_total{outcome="rejected",reason="expired"} 3
/// ```
#[tracing::instrument(skip_all, name = "jwt_gate.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
