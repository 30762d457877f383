//! jwt-gate error types.
//!
//! `AuthError` keeps every rejection reason distinct for logs and metrics.
//! `GateError` is what the HTTP surface sees: all authentication and
//! authorization failures collapse into a single bodiless 401 so callers
//! cannot tell which step failed. A request path that cannot be decoded is
//! a 400.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::jwt::JwtValidationError;
use serde::Serialize;
use thiserror::Error;

/// Why the gate rejected a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("request path cannot be decoded")]
    MalformedPath,

    #[error("no token found in request")]
    NoTokenFound,

    #[error("token is empty")]
    EmptyToken,

    #[error("token is malformed")]
    MalformedToken,

    #[error("token header has no key id")]
    MissingKeyId,

    #[error("token key id is not in the key set")]
    UnknownKey,

    #[error("token signature is invalid")]
    SignatureInvalid,

    #[error("token is expired")]
    TokenExpired,

    #[error("token is not valid yet")]
    TokenNotYetValid,

    #[error("token claims do not satisfy the access rules")]
    Unauthorized,
}

impl AuthError {
    /// Stable, bounded label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::NoTokenFound => "no_token",
            AuthError::EmptyToken => "empty_token",
            AuthError::MalformedPath => "malformed_path",
            AuthError::MalformedToken => "malformed_token",
            AuthError::MissingKeyId => "missing_kid",
            AuthError::UnknownKey => "unknown_key",
            AuthError::SignatureInvalid => "invalid_signature",
            AuthError::TokenExpired => "expired",
            AuthError::TokenNotYetValid => "not_yet_valid",
            AuthError::Unauthorized => "access_denied",
        }
    }
}

impl From<JwtValidationError> for AuthError {
    fn from(err: JwtValidationError) -> Self {
        match err {
            JwtValidationError::TokenTooLarge | JwtValidationError::MalformedToken => {
                AuthError::MalformedToken
            }
            JwtValidationError::MissingKid => AuthError::MissingKeyId,
            JwtValidationError::Expired => AuthError::TokenExpired,
            JwtValidationError::NotYetValid => AuthError::TokenNotYetValid,
        }
    }
}

/// Errors surfaced on the gate's HTTP responses.
///
/// Maps to:
/// - BadRequest: 400 Bad Request
/// - Unauthorized: 401, empty body, `WWW-Authenticate: Bearer`
/// - Upstream: 502 Bad Gateway
/// - UpstreamTimeout: 504 Gateway Timeout
/// - Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Bad request")]
    BadRequest,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Upstream timed out")]
    UpstreamTimeout,

    #[error("Internal server error")]
    Internal,
}

impl GateError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GateError::BadRequest => 400,
            GateError::Unauthorized => 401,
            GateError::Upstream(_) => 502,
            GateError::UpstreamTimeout => 504,
            GateError::Internal => 500,
        }
    }
}

impl From<AuthError> for GateError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MalformedPath => GateError::BadRequest,
            _ => GateError::Unauthorized,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            GateError::Unauthorized => {
                let mut response = StatusCode::UNAUTHORIZED.into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                return response;
            }
            GateError::BadRequest => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                "Malformed request path",
            ),
            GateError::Upstream(reason) => {
                // Log actual reason server-side, return generic message to client
                tracing::warn!(target: "jwt_gate.upstream", reason = %reason, "Upstream request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "BAD_GATEWAY",
                    "Upstream service unavailable",
                )
            }
            GateError::UpstreamTimeout => {
                tracing::warn!(target: "jwt_gate.upstream", "Upstream request timed out");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "GATEWAY_TIMEOUT",
                    "Upstream service timed out",
                )
            }
            GateError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred",
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: message.to_string(),
            },
        };

        (status, Json(error_response)).into_response()
    }
}
