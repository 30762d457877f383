//! Middleware for jwt-gate.
//!
//! # Components
//!
//! - `gate` - token gate as a tower layer
//! - `http_metrics` - request metrics for every response

pub mod gate;
pub mod http_metrics;

pub use gate::{ClaimsExt, GateOutcome, JwtGate, JwtGateLayer, JwtGateService};
pub use http_metrics::http_metrics_middleware;
