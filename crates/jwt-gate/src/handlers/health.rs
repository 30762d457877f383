//! Health check handler.
//!
//! - `/health`: Liveness probe - returns OK if the process is running
//!
//! There is no separate readiness probe: the rule table and key sets are
//! loaded before either listener binds, so a running process is ready.

/// Liveness probe handler.
///
/// Does NOT contact the upstream; failure means the process is hung.
pub async fn health_check() -> &'static str {
    "OK"
}
