//! Test server harness for E2E testing
//!
//! Provides `TestGateServer` for spawning a real jwt-gate proxy in tests.

use jwt_gate::auth::TokenValidator;
use jwt_gate::config::Config;
use jwt_gate::middleware::JwtGate;
use jwt_gate::routes::{self, AppState};
use jwt_gate::rules::load_rules;
use jwt_gate::services::UpstreamClient;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Test harness for spawning jwt-gate in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_hello_flow() -> Result<(), anyhow::Error> {
///     let upstream = wiremock::MockServer::start().await;
///     let server = TestGateServer::spawn(rules.path(), &upstream.uri()).await?;
///
///     let response = reqwest::Client::new()
///         .get(format!("{}/hello", server.url()))
///         .bearer_auth(token)
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestGateServer {
    addr: SocketAddr,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestGateServer {
    /// Spawn a gate loading `rules_file` and proxying to `upstream_url`.
    ///
    /// The server will:
    /// - Load the rule table with the production loader
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn(rules_file: &Path, upstream_url: &str) -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(rules_file, upstream_url, HashMap::new()).await
    }

    /// Like [`TestGateServer::spawn`] with extra configuration variables,
    /// e.g. `UPSTREAM_TIMEOUT_SECONDS`.
    pub async fn spawn_with_vars(
        rules_file: &Path,
        upstream_url: &str,
        extra_vars: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            (
                "JWT_GATE_RULES_FILE".to_string(),
                rules_file.display().to_string(),
            ),
            ("JWT_GATE_UPSTREAM_URL".to_string(), upstream_url.to_string()),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ]);
        vars.extend(extra_vars);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let rules = load_rules(&config.rules_file)
            .map_err(|e| anyhow::anyhow!("Failed to load rules: {}", e))?;

        let upstream = UpstreamClient::new(config.upstream_url.clone(), config.upstream_timeout)
            .map_err(|e| anyhow::anyhow!("Failed to create upstream client: {}", e))?;

        let state = Arc::new(AppState {
            config: config.clone(),
            upstream: Arc::new(upstream),
            gate: Arc::new(JwtGate::new(
                Arc::new(rules),
                TokenValidator::new(config.jwt_leeway),
            )),
        });

        // Build routes using jwt-gate's real route builder
        let app = routes::build_routes(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestGateServer {
    fn drop(&mut self) {
        // Explicitly abort the HTTP server task to ensure immediate cleanup
        self._handle.abort();
    }
}
