//! jwt-gate
//!
//! Entry point for the JWT authentication gate.
//! Loads the rule table, then serves the gated proxy and the admin
//! endpoints on separate listeners.

use jwt_gate::auth::TokenValidator;
use jwt_gate::config::{redact_url, Config};
use jwt_gate::middleware::JwtGate;
use jwt_gate::routes::{self, init_metrics_recorder, AppState};
use jwt_gate::rules::load_rules;
use jwt_gate::services::UpstreamClient;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jwt_gate=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting jwt-gate");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        rules_file = %config.rules_file.display(),
        upstream_url = %redact_url(&config.upstream_url),
        bind_address = %config.bind_address,
        admin_bind_address = %config.admin_bind_address,
        jwt_leeway_seconds = config.jwt_leeway.as_secs(),
        "Configuration loaded successfully"
    );

    // Rules and key sets are loaded once; failures are fatal
    let rules = load_rules(&config.rules_file).map_err(|e| {
        error!("Failed to load rules: {}", e);
        e
    })?;

    info!(rule_count = rules.len(), "Rules loaded");

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    let upstream = UpstreamClient::new(config.upstream_url.clone(), config.upstream_timeout)
        .map_err(|e| {
            error!("Failed to create upstream client: {}", e);
            e
        })?;

    let gate = JwtGate::new(Arc::new(rules), TokenValidator::new(config.jwt_leeway));

    // Parse bind addresses before moving config
    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;
    let admin_addr: SocketAddr = config.admin_bind_address.parse().map_err(|e| {
        error!("Invalid admin bind address: {}", e);
        e
    })?;
    let drain_period = config.drain_period;

    // Create application state
    let state = Arc::new(AppState {
        config,
        upstream: Arc::new(upstream),
        gate: Arc::new(gate),
    });

    let app = routes::build_routes(state);
    let admin_app = routes::build_admin_routes(metrics_handle);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let admin_listener = tokio::net::TcpListener::bind(admin_addr).await?;

    info!("jwt-gate listening on {}", addr);
    info!("Admin endpoints listening on {}", admin_addr);

    // One signal fans out to both servers
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal(drain_period).await;
        let _ = shutdown_tx.send(true);
    });

    let admin_server = axum::serve(admin_listener, admin_app)
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));
    let admin_handle = tokio::spawn(async move {
        if let Err(e) = admin_server.await {
            error!("Admin server error: {}", e);
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
        .await?;

    if let Err(e) = admin_handle.await {
        warn!("Admin server task failed: {}", e);
    }

    info!("jwt-gate shutdown complete");

    Ok(())
}

/// Resolves once the shutdown flag flips (or its sender is gone).
async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and drain period is complete.
async fn shutdown_signal(drain_period: Duration) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    if drain_period.is_zero() {
        info!("Skipping drain period (JWT_GATE_DRAIN_SECONDS=0)");
    } else {
        warn!("Draining connections for {} seconds...", drain_period.as_secs());
        tokio::time::sleep(drain_period).await;
        info!("Drain period complete");
    }
}
