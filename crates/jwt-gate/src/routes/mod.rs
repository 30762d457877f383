//! HTTP routes for jwt-gate.
//!
//! Defines the proxy and admin routers and the application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, JwtGate, JwtGateLayer};
use crate::services::UpstreamClient;
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub use crate::observability::metrics::init_metrics_recorder;

/// Slack on top of the upstream timeout before the whole request is
/// abandoned, so the upstream client reports 504 first.
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Client for the protected upstream.
    pub upstream: Arc<UpstreamClient>,

    /// Rule table and token validator.
    pub gate: Arc<JwtGate>,
}

/// Build the proxy router.
///
/// Every path falls through to the proxy handler; the gate decides per
/// path whether a token is needed:
/// - JwtGateLayer for rule evaluation and claim headers
/// - TraceLayer for request logging
/// - Request timeout derived from the upstream timeout
/// - HTTP metrics middleware
pub fn build_routes(state: Arc<AppState>) -> Router {
    let gate = state.gate.clone();
    let request_timeout = state.config.upstream_timeout + REQUEST_TIMEOUT_MARGIN;

    // Layer order (bottom-to-top execution):
    // 1. JwtGateLayer - Reject before the upstream is contacted (innermost)
    // 2. TraceLayer - Log request details
    // 3. TimeoutLayer - Timeout the request
    // 4. http_metrics_middleware - Record ALL responses (outermost)
    Router::new()
        .fallback(handlers::proxy_handler)
        .with_state(state)
        .layer(JwtGateLayer::new(gate))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        // HTTP metrics layer (outermost) - captures gate rejections and
        // upstream failures alike
        .layer(middleware::from_fn(http_metrics_middleware))
}

/// Build the admin router served on its own listener.
///
/// - `/health` - Liveness probe (simple "OK")
/// - `/metrics` - Prometheus metrics endpoint
pub fn build_admin_routes(metrics_handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle)
}
