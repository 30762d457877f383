//! Builder patterns for test claim sets

use chrono::{Duration, Utc};
use serde_json::{Map, Value};

/// Builder for test JWT claims.
///
/// Defaults to `sub: test-subject`, `iat: now` and `exp: now + 1h`.
///
/// # Example
/// ```rust,ignore
/// let claims = TestTokenBuilder::new()
///     .for_user("alice")
///     .claim("role", "admin")
///     .expires_in(-60)
///     .build();
/// ```
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
}

impl TestTokenBuilder {
    pub fn new() -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("sub".to_string(), Value::from("test-subject"));
        claims.insert("iat".to_string(), Value::from(now.timestamp()));
        claims.insert(
            "exp".to_string(),
            Value::from((now + Duration::seconds(3600)).timestamp()),
        );
        Self { claims }
    }

    /// Set the subject
    pub fn for_user(self, subject: &str) -> Self {
        self.claim("sub", subject)
    }

    /// Set an arbitrary claim
    pub fn claim(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.claims.insert(name.to_string(), value.into());
        self
    }

    /// Remove a claim, including the defaults
    pub fn without(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Set expiration in seconds from now (negative for the past)
    pub fn expires_in(self, seconds: i64) -> Self {
        let exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.claim("exp", exp)
    }

    /// Set not-before in seconds from now (negative for the past)
    pub fn not_before_in(self, seconds: i64) -> Self {
        let nbf = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.claim("nbf", nbf)
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        Value::Object(self.claims)
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
