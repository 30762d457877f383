//! Bearer token extraction.
//!
//! Carriers are tried in a fixed order and the first one that yields a
//! value wins:
//!
//! 1. `Authorization: Bearer <token>`
//! 2. the `jwt_token` cookie
//! 3. the `token` query parameter

use crate::errors::AuthError;
use axum::http::{header, HeaderMap, Request, Uri};

/// Name of the cookie carrying a token.
pub const TOKEN_COOKIE: &str = "jwt_token";

/// Name of the query parameter carrying a token.
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Find a candidate token in `request`.
///
/// # Errors
///
/// Returns `AuthError::NoTokenFound` when no carrier yields a value.
pub fn extract_token<B>(request: &Request<B>) -> Result<String, AuthError> {
    extract_from_parts(request.headers(), request.uri())
}

/// Same as [`extract_token`], for callers holding headers and URI separately.
///
/// # Errors
///
/// Returns `AuthError::NoTokenFound` when no carrier yields a value.
pub fn extract_from_parts(headers: &HeaderMap, uri: &Uri) -> Result<String, AuthError> {
    if let Some(token) = from_authorization(headers) {
        return Ok(token);
    }

    if let Some(token) = from_cookie(headers) {
        return Ok(token);
    }

    if let Some(token) = from_query(uri) {
        return Ok(token);
    }

    tracing::debug!(target: "jwt_gate.auth.extract", "No token carrier present");
    Err(AuthError::NoTokenFound)
}

/// The header must split on single spaces into exactly `Bearer` and one
/// more part. The second part may be empty.
fn from_authorization(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Some(token.to_string()),
        _ => None,
    }
}

/// A present cookie is returned even when its value is empty.
fn from_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| name.trim() == TOKEN_COOKIE)
        .map(|(_, value)| strip_quotes(value.trim()).to_string())
}

fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Only a non-empty query value counts.
fn from_query(uri: &Uri) -> Option<String> {
    let query = uri.query()?;

    url::form_urlencoded::parse(query.as_bytes())
        .find(|(name, _)| name == TOKEN_QUERY_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
