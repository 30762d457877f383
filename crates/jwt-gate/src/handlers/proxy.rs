//! Fallback handler forwarding every request to the upstream.
//!
//! Runs behind the gate layer, so protected requests only get here with
//! their `Token-Claim-*` headers already set.

use crate::errors::GateError;
use crate::routes::AppState;
use axum::extract::{Request, State};
use axum::response::Response;
use std::sync::Arc;

/// Forward the request to the configured upstream.
pub async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, GateError> {
    state.upstream.forward(request).await
}
