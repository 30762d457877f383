//! Upstream HTTP client.
//!
//! Forwards requests the gate let through to the configured upstream and
//! streams the response back.
//!
//! # Security
//!
//! - Hop-by-hop headers are never forwarded in either direction
//! - The inbound `Host` header is replaced by the upstream's
//! - Errors are logged server-side with generic messages returned

use crate::errors::GateError;
use axum::body::{Body, HttpBody};
use axum::extract::Request;
use axum::http::{header, HeaderMap, HeaderName, Uri};
use axum::response::Response;
use reqwest::Client;
use std::time::Duration;
use tracing::instrument;
use url::Url;

/// Headers that describe a single connection and must not be proxied.
const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Client for the single configured upstream.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    base_url: Url,
}

impl UpstreamClient {
    /// Create a client for `base_url` with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `GateError::Internal` if the HTTP client cannot be built.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, GateError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                tracing::error!(target: "jwt_gate.upstream", error = %e, "Failed to build HTTP client");
                GateError::Internal
            })?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Upstream URL for an inbound request URI: the base path followed by the
    /// request path, with the request query kept.
    pub fn target_url(&self, uri: &Uri) -> Url {
        let mut url = self.base_url.clone();
        let base_path = self.base_url.path().trim_end_matches('/');
        url.set_path(&format!("{base_path}{}", uri.path()));
        url.set_query(uri.query());
        url
    }

    /// Forward `request` and return the upstream response.
    ///
    /// # Errors
    ///
    /// - `GateError::UpstreamTimeout` if the upstream does not answer in time
    /// - `GateError::Upstream` for connection and protocol failures
    #[instrument(skip_all, name = "jwt_gate.upstream.forward", fields(method = %request.method()))]
    pub async fn forward(&self, request: Request) -> Result<Response, GateError> {
        let (parts, body) = request.into_parts();
        let url = self.target_url(&parts.uri);

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);

        let mut upstream_request = self.client.request(parts.method, url).headers(headers);
        if body.size_hint().exact() != Some(0) {
            upstream_request =
                upstream_request.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream_response = upstream_request.send().await.map_err(|e| {
            if e.is_timeout() {
                GateError::UpstreamTimeout
            } else {
                GateError::Upstream(e.to_string())
            }
        })?;

        tracing::debug!(
            target: "jwt_gate.upstream",
            status = upstream_response.status().as_u16(),
            "Upstream responded"
        );

        let status = upstream_response.status();
        let mut response_headers = upstream_response.headers().clone();
        strip_hop_by_hop(&mut response_headers);

        let mut response = Response::new(Body::from_stream(upstream_response.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;

        Ok(response)
    }
}

/// Remove hop-by-hop headers, including any listed in `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in &listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}
