//! Validated token claims and their propagation as request headers.
//!
//! Claims are decoded from the token payload into a closed set of value
//! types. Each value has exactly one textual form, used both by the access
//! rule comparison and by the `Token-Claim-*` headers handed downstream.
//! Values are redacted in Debug output.

use crate::errors::AuthError;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Prefix of every header written for a validated claim.
pub const CLAIM_HEADER_PREFIX: &str = "Token-Claim-";

/// A single claim value.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    Float(f64),
    /// JSON null, arrays and objects. Renders as an empty string and never
    /// equals an expected value.
    Absent,
}

impl ClaimValue {
    /// Whether this value's textual form equals `expected`.
    pub fn matches(&self, expected: &str) -> bool {
        match self {
            ClaimValue::Absent => false,
            ClaimValue::String(s) => s == expected,
            other => other.to_string() == expected,
        }
    }

    /// Interpret the value as a NumericDate (Unix seconds, fraction dropped).
    #[allow(clippy::cast_possible_truncation)]
    fn as_numeric_date(&self) -> Option<i64> {
        match self {
            ClaimValue::Integer(i) => Some(*i),
            ClaimValue::Float(f) => Some(f.trunc() as i64),
            _ => None,
        }
    }
}

impl From<Value> for ClaimValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => ClaimValue::String(s),
            Value::Bool(b) => ClaimValue::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ClaimValue::Integer(i),
                None => n.as_f64().map_or(ClaimValue::Absent, ClaimValue::Float),
            },
            Value::Null | Value::Array(_) | Value::Object(_) => ClaimValue::Absent,
        }
    }
}

/// Integers in base 10, booleans as `true`/`false`, floats in the shortest
/// decimal that round-trips (never exponent notation).
impl fmt::Display for ClaimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimValue::String(s) => f.write_str(s),
            ClaimValue::Integer(i) => write!(f, "{i}"),
            ClaimValue::Boolean(b) => write!(f, "{b}"),
            ClaimValue::Float(x) => write!(f, "{x}"),
            ClaimValue::Absent => Ok(()),
        }
    }
}

/// The full claim set of a validated token.
#[derive(Clone, Default, PartialEq)]
pub struct Claims {
    values: BTreeMap<String, ClaimValue>,
}

impl Claims {
    /// Build a claim set from a decoded JSON payload.
    pub fn from_json_map(map: serde_json::Map<String, Value>) -> Self {
        Self {
            values: map
                .into_iter()
                .map(|(name, value)| (name, ClaimValue::from(value)))
                .collect(),
        }
    }

    /// Look up a claim by name.
    pub fn get(&self, name: &str) -> Option<&ClaimValue> {
        self.values.get(name)
    }

    /// Iterate claims in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ClaimValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Read a reserved timing claim (`exp`, `nbf`, `iat`).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MalformedToken` if the claim is present but not a
    /// number.
    pub fn numeric_date(&self, name: &str) -> Result<Option<i64>, AuthError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(value) => value.as_numeric_date().map(Some).ok_or_else(|| {
                tracing::debug!(target: "jwt_gate.auth.claims", claim = %name, "Timing claim is not numeric");
                AuthError::MalformedToken
            }),
        }
    }

    /// Write one `Token-Claim-<name>` header per claim, replacing any header
    /// of the same name. Claims that cannot form a valid header are skipped.
    pub fn write_headers(&self, headers: &mut HeaderMap) {
        for (name, value) in self.iter() {
            let header_name = claim_header_name(name);
            let Ok(header_name) = HeaderName::from_bytes(header_name.as_bytes()) else {
                tracing::warn!(target: "jwt_gate.auth.claims", claim = %name, "Claim name is not a valid header name, skipping");
                continue;
            };
            let Ok(header_value) = HeaderValue::from_bytes(value.to_string().as_bytes()) else {
                tracing::warn!(target: "jwt_gate.auth.claims", claim = %name, "Claim value is not a valid header value, skipping");
                continue;
            };
            headers.insert(header_name, header_value);
        }
    }
}

/// Claim values are redacted; only names are shown.
impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("names", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Header name for a claim: the fixed prefix plus the claim name with every
/// `:` replaced by `-`.
pub fn claim_header_name(claim: &str) -> String {
    format!("{CLAIM_HEADER_PREFIX}{}", claim.replace(':', "-"))
}

/// Remove every inbound `Token-Claim-*` header.
pub fn strip_claim_headers(headers: &mut HeaderMap) {
    let prefix = CLAIM_HEADER_PREFIX.to_ascii_lowercase();
    let stale: Vec<HeaderName> = headers
        .keys()
        .filter(|name| name.as_str().starts_with(&prefix))
        .cloned()
        .collect();

    for name in stale {
        headers.remove(&name);
    }
}
