//! JWT utilities shared across jwt-gate crates.
//!
//! This module provides the parts of token handling that do not depend on
//! key material:
//! - Size limits for DoS prevention
//! - Leeway constants for time-based claim checks
//! - Decoding of the compact-serialization protected header (`alg`, `kid`)
//! - `exp` / `nbf` window validation against an explicit clock
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - The protected header is decoded without verifying the signature; the
//!   `kid` it yields is only ever used to select a key from a trusted set
//! - Error messages are generic; detail is logged at debug level

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Tokens larger than this are rejected before any base64 decoding or
/// signature work. Typical tokens are a few hundred bytes.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default leeway applied to `exp` and `nbf`: none, comparisons are exact.
pub const DEFAULT_LEEWAY: Duration = Duration::from_secs(0);

/// Maximum configurable leeway (10 minutes).
pub const MAX_LEEWAY: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors from header decoding and time-window validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The token is invalid")]
    TokenTooLarge,

    /// Token format is invalid (not a compact JWS, bad base64, bad JSON).
    #[error("The token is invalid")]
    MalformedToken,

    /// Protected header carries no usable `kid`.
    #[error("The token is invalid")]
    MissingKid,

    /// `exp` lies in the past.
    #[error("The token is expired")]
    Expired,

    /// `nbf` lies in the future.
    #[error("The token is not valid yet")]
    NotYetValid,
}

// =============================================================================
// Header
// =============================================================================

/// Protected header of a compact-serialized JWS, as far as key selection
/// needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactHeader {
    /// Declared signature algorithm, verbatim (e.g. `"RS256"`, `"EdDSA"`).
    pub alg: String,

    /// Key identifier.
    pub kid: String,
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
    #[serde(default)]
    kid: Option<serde_json::Value>,
}

/// Decode the protected header of `token` without verifying the signature.
///
/// # Errors
///
/// - `TokenTooLarge` - token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` - not three dot-separated parts, header not base64url
///   JSON, or `alg` missing / not a string
/// - `MissingKid` - `kid` absent, empty, or not a string
pub fn decode_header(token: &str) -> Result<CompactHeader, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let mut parts = token.split('.');
    let (Some(header_part), Some(_), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        tracing::debug!(target: "common.jwt", "Token rejected: not a compact JWS");
        return Err(JwtValidationError::MalformedToken);
    };

    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: RawHeader = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    let kid = header
        .kid
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingKid)?;

    Ok(CompactHeader {
        alg: header.alg,
        kid,
    })
}

// =============================================================================
// Time window
// =============================================================================

/// Validate `exp` and `nbf` against an explicit `now` (Unix seconds).
///
/// A token is expired when `now - leeway > exp` and not yet valid when
/// `now + leeway < nbf`. Absent claims are not checked.
///
/// # Errors
///
/// - `Expired` - `exp` is in the past
/// - `NotYetValid` - `nbf` is in the future
pub fn validate_time_window_at(
    exp: Option<i64>,
    nbf: Option<i64>,
    leeway: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // Safe cast: leeway is bounded to MAX_LEEWAY by configuration
    #[allow(clippy::cast_possible_wrap)]
    let leeway_secs = leeway.as_secs() as i64;

    if let Some(exp) = exp {
        if now.saturating_sub(leeway_secs) > exp {
            tracing::debug!(target: "common.jwt", exp, now, leeway_secs, "Token rejected: expired");
            return Err(JwtValidationError::Expired);
        }
    }

    if let Some(nbf) = nbf {
        if now.saturating_add(leeway_secs) < nbf {
            tracing::debug!(target: "common.jwt", nbf, now, leeway_secs, "Token rejected: not valid yet");
            return Err(JwtValidationError::NotYetValid);
        }
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
