//! Token gate for path-scoped rules.
//!
//! The request path is first canonicalized (see [`crate::rules::path`]) and
//! the request URI rewritten to it, so the upstream receives exactly the
//! path the rules were matched against. Then the first rule matching that
//! path decides:
//!
//! 1. No matching rule: the request passes through with its headers
//!    untouched
//! 2. Token extracted, validated against the rule's key set, and its claims
//!    checked against the rule's predicates
//! 3. On success, inbound `Token-Claim-*` headers are replaced by one header
//!    per validated claim and the claims are stored in request extensions
//! 4. On any failure, the inner service is not called and the response is
//!    a bodiless 401
//!
//! Evaluation is synchronous; nothing awaits between extraction and the
//! decision.

use crate::auth::claims::{strip_claim_headers, Claims};
use crate::auth::{authorize, extract_token, TokenValidator};
use crate::errors::{AuthError, GateError};
use crate::observability::metrics::{record_auth_decision, record_token_validation};
use crate::rules::{canonicalize_path, encode_path, Rule, RuleTable};
use axum::http::uri::PathAndQuery;
use axum::http::{Request, Uri};
use axum::response::{IntoResponse, Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::instrument;

/// What the gate did with a request it let through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// No rule covers the path.
    Unprotected,
    /// The rule at `rule_path` accepted the token.
    Authorized { rule_path: String },
}

/// Rule table plus validator; shared by every request.
#[derive(Debug, Clone)]
pub struct JwtGate {
    rules: Arc<RuleTable>,
    validator: TokenValidator,
}

impl JwtGate {
    pub fn new(rules: Arc<RuleTable>, validator: TokenValidator) -> Self {
        Self { rules, validator }
    }

    /// Decide on `request`, rewriting its claim headers when authorized.
    ///
    /// # Errors
    ///
    /// Returns the `AuthError` of the first failing step on a protected path.
    #[instrument(skip_all, name = "jwt_gate.gate.check", fields(path = %request.uri().path()))]
    pub fn check<B>(&self, request: &mut Request<B>) -> Result<GateOutcome, AuthError> {
        if let Err(err) = canonicalize_uri(request) {
            tracing::debug!(target: "jwt_gate.middleware", reason = err.reason(), "Request rejected");
            record_auth_decision("rejected", err.reason());
            return Err(err);
        }

        let Some(rule) = self.rules.first_match(request.uri().path()) else {
            record_auth_decision("unprotected", "none");
            return Ok(GateOutcome::Unprotected);
        };

        match self.evaluate(request, rule) {
            Ok(claims) => {
                let headers = request.headers_mut();
                strip_claim_headers(headers);
                claims.write_headers(headers);
                request.extensions_mut().insert(claims);

                tracing::debug!(target: "jwt_gate.middleware", rule = %rule.path(), "Request authorized");
                record_auth_decision("allowed", "none");
                Ok(GateOutcome::Authorized {
                    rule_path: rule.path().to_string(),
                })
            }
            Err(err) => {
                tracing::debug!(
                    target: "jwt_gate.middleware",
                    rule = %rule.path(),
                    reason = err.reason(),
                    "Request rejected"
                );
                record_auth_decision("rejected", err.reason());
                Err(err)
            }
        }
    }

    fn evaluate<B>(&self, request: &Request<B>, rule: &Rule) -> Result<Claims, AuthError> {
        let token = extract_token(request)?;

        let start = Instant::now();
        let validated = self.validator.validate(&token, rule.keys());
        record_token_validation(
            if validated.is_ok() { "success" } else { "error" },
            start.elapsed(),
        );
        let claims = validated?;

        if !authorize(&claims, rule.access_rules()) {
            return Err(AuthError::Unauthorized);
        }

        Ok(claims)
    }
}

/// Rewrite the request URI to its canonical path, keeping the query.
fn canonicalize_uri<B>(request: &mut Request<B>) -> Result<(), AuthError> {
    let raw_path = request.uri().path();
    let canonical = canonicalize_path(raw_path).ok_or(AuthError::MalformedPath)?;
    if canonical == raw_path {
        return Ok(());
    }

    let encoded = encode_path(&canonical);
    let path_and_query = match request.uri().query() {
        Some(query) => format!("{encoded}?{query}"),
        None => encoded,
    };

    let mut parts = request.uri().clone().into_parts();
    parts.path_and_query =
        Some(PathAndQuery::try_from(path_and_query).map_err(|_| AuthError::MalformedPath)?);
    *request.uri_mut() = Uri::from_parts(parts).map_err(|_| AuthError::MalformedPath)?;

    Ok(())
}

/// Access to the claims the gate stored on an authorized request.
pub trait ClaimsExt {
    /// `None` when the request was not authorized by the gate.
    fn claims(&self) -> Option<&Claims>;
}

impl<B> ClaimsExt for Request<B> {
    fn claims(&self) -> Option<&Claims> {
        self.extensions().get::<Claims>()
    }
}

/// Tower layer wrapping a downstream service with the gate.
#[derive(Clone)]
pub struct JwtGateLayer {
    gate: Arc<JwtGate>,
}

impl JwtGateLayer {
    pub fn new(gate: Arc<JwtGate>) -> Self {
        Self { gate }
    }
}

impl<S> Layer<S> for JwtGateLayer {
    type Service = JwtGateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        JwtGateService {
            inner,
            gate: self.gate.clone(),
        }
    }
}

/// Tower service produced by [`JwtGateLayer`].
#[derive(Clone)]
pub struct JwtGateService<S> {
    inner: S,
    gate: Arc<JwtGate>,
}

impl<S, ReqBody> Service<Request<ReqBody>> for JwtGateService<S>
where
    S: Service<Request<ReqBody>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        // The readied service is the one that must be called
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        match self.gate.check(&mut req) {
            Ok(_) => Box::pin(inner.call(req)),
            Err(err) => {
                let response = GateError::from(err).into_response();
                Box::pin(async { Ok(response) })
            }
        }
    }
}
