//! Token validation against a per-path key set.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - A `kid` is mandatory; tokens are never tried against every key
//! - Only the algorithm named in the token header is allowed, and it must
//!   agree with the key's declared `alg` when the key declares one
//! - `exp` / `nbf` are checked here with an explicit leeway, not by
//!   jsonwebtoken's built-in validation

use crate::auth::claims::Claims;
use crate::auth::jwks::KeySet;
use crate::errors::AuthError;
use common::jwt::{decode_header, validate_time_window_at, DEFAULT_LEEWAY};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

/// Validates tokens and produces their claim sets.
#[derive(Debug, Clone, Copy)]
pub struct TokenValidator {
    leeway: Duration,
}

impl TokenValidator {
    /// Create a validator applying `leeway` to `exp` and `nbf`.
    pub fn new(leeway: Duration) -> Self {
        Self { leeway }
    }

    pub fn leeway(&self) -> Duration {
        self.leeway
    }

    /// Validate `token` against `keys` at the current wall-clock time.
    ///
    /// # Errors
    ///
    /// See [`TokenValidator::validate_at`].
    pub fn validate(&self, token: &str, keys: &KeySet) -> Result<Claims, AuthError> {
        self.validate_at(token, keys, chrono::Utc::now().timestamp())
    }

    /// Validate `token` against `keys` with `now` in Unix seconds.
    ///
    /// # Security Checks
    ///
    /// 1. Non-empty, size-limited, three-part compact JWS
    /// 2. `kid` present and resolvable in `keys`
    /// 3. Signature verified with the header algorithm only
    /// 4. Payload is a JSON object with numeric timing claims
    /// 5. `exp` then `nbf` against `now` with leeway
    ///
    /// # Errors
    ///
    /// - `EmptyToken` - token is the empty string
    /// - `MalformedToken` - oversized, not a compact JWS, bad base64 or JSON,
    ///   or non-numeric `exp` / `nbf` / `iat`
    /// - `MissingKeyId` - header has no usable `kid`
    /// - `UnknownKey` - no key in `keys` carries the `kid`
    /// - `SignatureInvalid` - unsupported or mismatched algorithm, unusable
    ///   key material, or failed verification
    /// - `TokenExpired` / `TokenNotYetValid` - outside the validity window
    pub fn validate_at(&self, token: &str, keys: &KeySet, now: i64) -> Result<Claims, AuthError> {
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }

        let header = decode_header(token)?;

        let jwk = keys.find(&header.kid).ok_or_else(|| {
            tracing::debug!(target: "jwt_gate.auth.jwt", kid = %header.kid, "Token kid not in key set");
            AuthError::UnknownKey
        })?;

        let algorithm = resolve_algorithm(&header.alg, jwk)?;

        let decoding_key = DecodingKey::from_jwk(jwk).map_err(|e| {
            tracing::warn!(target: "jwt_gate.auth.jwt", kid = %header.kid, error = %e, "Key material cannot be used for verification");
            AuthError::SignatureInvalid
        })?;

        let claims = verify_token(token, &decoding_key, algorithm)?;

        let exp = claims.numeric_date("exp")?;
        let nbf = claims.numeric_date("nbf")?;
        claims.numeric_date("iat")?;

        validate_time_window_at(exp, nbf, self.leeway, now)?;

        tracing::debug!(target: "jwt_gate.auth.jwt", kid = %header.kid, "Token validated successfully");
        Ok(claims)
    }
}

impl Default for TokenValidator {
    fn default() -> Self {
        Self::new(DEFAULT_LEEWAY)
    }
}

/// Map the header `alg` to a supported algorithm and check it against the
/// key's declared algorithm.
fn resolve_algorithm(alg: &str, jwk: &Jwk) -> Result<Algorithm, AuthError> {
    let algorithm = Algorithm::from_str(alg).map_err(|_| {
        tracing::debug!(target: "jwt_gate.auth.jwt", alg = %alg, "Unsupported token algorithm");
        AuthError::SignatureInvalid
    })?;

    if let Some(declared) = &jwk.common.key_algorithm {
        // KeyAlgorithm's signing variants are named after their JWA identifiers
        if format!("{declared:?}") != alg {
            tracing::debug!(
                target: "jwt_gate.auth.jwt",
                alg = %alg,
                key_alg = ?declared,
                "Token algorithm does not match key algorithm"
            );
            return Err(AuthError::SignatureInvalid);
        }
    }

    Ok(algorithm)
}

fn verify_token(
    token: &str,
    decoding_key: &DecodingKey,
    algorithm: Algorithm,
) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    let token_data =
        decode::<serde_json::Map<String, serde_json::Value>>(token, decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!(target: "jwt_gate.auth.jwt", error = %e, "Token verification failed");
                match e.kind() {
                    ErrorKind::InvalidToken
                    | ErrorKind::Base64(_)
                    | ErrorKind::Json(_)
                    | ErrorKind::Utf8(_) => AuthError::MalformedToken,
                    _ => AuthError::SignatureInvalid,
                }
            })?;

    Ok(Claims::from_json_map(token_data.claims))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::claims::ClaimValue;
    use gate_test_utils::{jwks_json, unsigned_token, TestHmacKey, TestKeypair, TestTokenBuilder};
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn keys_for(jwks: &[serde_json::Value]) -> KeySet {
        KeySet::from_json(&jwks_json(jwks)).unwrap()
    }

    fn claims_at(now: i64) -> TestTokenBuilder {
        TestTokenBuilder::new()
            .claim("iat", now)
            .claim("exp", now + 3600)
    }

    #[test]
    fn test_valid_token_returns_all_claims() {
        let keypair = TestKeypair::new(1, "key-1");
        let keys = keys_for(&[keypair.jwk()]);
        let token = keypair.sign(
            &claims_at(NOW)
                .for_user("alice")
                .claim("role", "admin")
                .claim("level", 3)
                .build(),
        );

        let claims = TokenValidator::default().validate_at(&token, &keys, NOW).unwrap();

        assert_eq!(claims.get("sub"), Some(&ClaimValue::String("alice".to_string())));
        assert_eq!(claims.get("role"), Some(&ClaimValue::String("admin".to_string())));
        assert_eq!(claims.get("level"), Some(&ClaimValue::Integer(3)));
        assert_eq!(claims.get("exp"), Some(&ClaimValue::Integer(NOW + 3600)));
    }

    #[test]
    fn test_validate_uses_wall_clock() {
        let keypair = TestKeypair::new(1, "key-1");
        let keys = keys_for(&[keypair.jwk()]);

        let fresh = keypair.sign(&TestTokenBuilder::new().build());
        let stale = keypair.sign(&TestTokenBuilder::new().expires_in(-60).build());

        assert!(TokenValidator::default().validate(&fresh, &keys).is_ok());
        assert_eq!(
            TokenValidator::default().validate(&stale, &keys),
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn test_empty_token() {
        assert_eq!(
            TokenValidator::default().validate_at("", &KeySet::empty(), NOW),
            Err(AuthError::EmptyToken)
        );
    }

    #[test]
    fn test_malformed_tokens() {
        let validator = TokenValidator::default();
        let keys = KeySet::empty();

        for token in ["garbage", "a.b", "a.b.c.d", "!!!.payload.sig"] {
            assert_eq!(
                validator.validate_at(token, &keys, NOW),
                Err(AuthError::MalformedToken),
                "token {token:?}"
            );
        }
    }

    #[test]
    fn test_oversized_token_is_malformed() {
        let keypair = TestKeypair::new(1, "key-1");
        let keys = keys_for(&[keypair.jwk()]);
        let token = keypair.sign(&claims_at(NOW).claim("padding", "x".repeat(9000)).build());

        assert_eq!(
            TokenValidator::default().validate_at(&token, &keys, NOW),
            Err(AuthError::MalformedToken)
        );
    }

    #[test]
    fn test_missing_kid_regardless_of_signature() {
        let keypair = TestKeypair::new(1, "key-1");
        let keys = keys_for(&[keypair.jwk()]);

        let signed = keypair.sign_with_kid(None, &claims_at(NOW).build());
        let forged = unsigned_token(&json!({"alg": "EdDSA"}), &json!({"sub": "x"}));

        for token in [signed, forged] {
            assert_eq!(
                TokenValidator::default().validate_at(&token, &keys, NOW),
                Err(AuthError::MissingKeyId)
            );
        }
    }

    #[test]
    fn test_unknown_kid() {
        let keypair = TestKeypair::new(1, "key-1");
        let keys = keys_for(&[keypair.jwk()]);
        let token = keypair.sign_with_kid(Some("key-2"), &claims_at(NOW).build());

        assert_eq!(
            TokenValidator::default().validate_at(&token, &keys, NOW),
            Err(AuthError::UnknownKey)
        );
    }

    #[test]
    fn test_signature_from_other_key_is_rejected() {
        let trusted = TestKeypair::new(1, "key-1");
        let attacker = TestKeypair::new(2, "key-1");
        let keys = keys_for(&[trusted.jwk()]);
        let token = attacker.sign(&claims_at(NOW).build());

        assert_eq!(
            TokenValidator::default().validate_at(&token, &keys, NOW),
            Err(AuthError::SignatureInvalid)
        );
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let keypair = TestKeypair::new(1, "key-1");
        let keys = keys_for(&[keypair.jwk()]);
        let token = keypair.sign(&claims_at(NOW).claim("role", "user").build());
        let forged_payload = unsigned_token(&json!({}), &claims_at(NOW).claim("role", "admin").build());

        let mut parts = token.split('.');
        let (header, signature) = (parts.next().unwrap(), parts.nth(1).unwrap());
        let payload = forged_payload.split('.').nth(1).unwrap();
        let tampered = format!("{header}.{payload}.{signature}");

        assert_eq!(
            TokenValidator::default().validate_at(&tampered, &keys, NOW),
            Err(AuthError::SignatureInvalid)
        );
    }

    #[test]
    fn test_unsupported_algorithm_is_signature_invalid() {
        let keypair = TestKeypair::new(1, "key-1");
        let keys = keys_for(&[keypair.jwk_without_alg()]);
        let token = unsigned_token(&json!({"alg": "none", "kid": "key-1"}), &json!({"sub": "x"}));

        assert_eq!(
            TokenValidator::default().validate_at(&token, &keys, NOW),
            Err(AuthError::SignatureInvalid)
        );
    }

    #[test]
    fn test_algorithm_must_match_key_declaration() {
        let keypair = TestKeypair::new(1, "shared");
        let hmac = TestHmacKey::new("shared", b"a-shared-secret-of-decent-length");

        // HS256 token presented against an EdDSA key
        let keys = keys_for(&[keypair.jwk()]);
        let token = hmac.sign(&claims_at(NOW).build());

        assert_eq!(
            TokenValidator::default().validate_at(&token, &keys, NOW),
            Err(AuthError::SignatureInvalid)
        );
    }

    #[test]
    fn test_algorithm_family_must_match_undeclared_key() {
        let keypair = TestKeypair::new(1, "shared");
        let hmac = TestHmacKey::new("shared", b"a-shared-secret-of-decent-length");
        let keys = keys_for(&[keypair.jwk_without_alg()]);
        let token = hmac.sign(&claims_at(NOW).build());

        assert_eq!(
            TokenValidator::default().validate_at(&token, &keys, NOW),
            Err(AuthError::SignatureInvalid)
        );
    }

    #[test]
    fn test_hmac_key_verifies() {
        let hmac = TestHmacKey::new("hmac-1", b"a-shared-secret-of-decent-length");
        let keys = keys_for(&[hmac.jwk()]);
        let token = hmac.sign(&claims_at(NOW).claim("role", "admin").build());

        let claims = TokenValidator::default().validate_at(&token, &keys, NOW).unwrap();
        assert!(claims.get("role").unwrap().matches("admin"));
    }

    #[test]
    fn test_expired_token() {
        let keypair = TestKeypair::new(1, "key-1");
        let keys = keys_for(&[keypair.jwk()]);
        let token = keypair.sign(&claims_at(NOW).claim("exp", NOW - 1).build());

        assert_eq!(
            TokenValidator::default().validate_at(&token, &keys, NOW),
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn test_exp_equal_to_now_is_valid() {
        let keypair = TestKeypair::new(1, "key-1");
        let keys = keys_for(&[keypair.jwk()]);
        let token = keypair.sign(&claims_at(NOW).claim("exp", NOW).build());

        assert!(TokenValidator::default().validate_at(&token, &keys, NOW).is_ok());
    }

    #[test]
    fn test_not_yet_valid_token() {
        let keypair = TestKeypair::new(1, "key-1");
        let keys = keys_for(&[keypair.jwk()]);
        let token = keypair.sign(&claims_at(NOW).claim("nbf", NOW + 60).build());

        assert_eq!(
            TokenValidator::default().validate_at(&token, &keys, NOW),
            Err(AuthError::TokenNotYetValid)
        );
    }

    #[test]
    fn test_leeway_tolerates_small_skew() {
        let keypair = TestKeypair::new(1, "key-1");
        let keys = keys_for(&[keypair.jwk()]);
        let token = keypair.sign(
            &claims_at(NOW)
                .claim("exp", NOW - 20)
                .claim("nbf", NOW + 20)
                .build(),
        );
        let validator = TokenValidator::new(Duration::from_secs(30));

        assert_eq!(validator.leeway(), Duration::from_secs(30));
        assert!(validator.validate_at(&token, &keys, NOW).is_ok());
    }

    #[test]
    fn test_token_without_timing_claims_is_valid() {
        let keypair = TestKeypair::new(1, "key-1");
        let keys = keys_for(&[keypair.jwk()]);
        let token = keypair.sign(&json!({"sub": "alice"}));

        let claims = TokenValidator::default().validate_at(&token, &keys, NOW).unwrap();
        assert_eq!(claims.len(), 1);
    }

    #[test]
    fn test_non_numeric_timing_claim_is_malformed() {
        let keypair = TestKeypair::new(1, "key-1");
        let keys = keys_for(&[keypair.jwk()]);

        for claim in ["exp", "nbf", "iat"] {
            let token = keypair.sign(&claims_at(NOW).claim(claim, "tomorrow").build());
            assert_eq!(
                TokenValidator::default().validate_at(&token, &keys, NOW),
                Err(AuthError::MalformedToken),
                "claim {claim}"
            );
        }
    }

    #[test]
    fn test_non_object_payload_is_malformed() {
        let keypair = TestKeypair::new(1, "key-1");
        let keys = keys_for(&[keypair.jwk()]);
        let token = keypair.sign(&json!(["not", "an", "object"]));

        assert_eq!(
            TokenValidator::default().validate_at(&token, &keys, NOW),
            Err(AuthError::MalformedToken)
        );
    }
}
