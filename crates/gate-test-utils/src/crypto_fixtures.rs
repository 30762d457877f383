//! Deterministic cryptographic fixtures for testing
//!
//! Provides reproducible Ed25519 and HMAC keys, their JWK forms, and token
//! signing. All fixtures are deterministic based on seed values.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use ring::signature::{Ed25519KeyPair, KeyPair};
use serde_json::{json, Value};

/// Ed25519 keypair with a key id, for signing test tokens.
///
/// # Example
/// ```rust,ignore
/// let keypair = TestKeypair::new(1, "key-1");
/// let token = keypair.sign(&TestTokenBuilder::new().claim("role", "admin").build());
/// let jwks = jwks_json(&[keypair.jwk()]);
/// ```
pub struct TestKeypair {
    pub kid: String,
    public_key_bytes: Vec<u8>,
    private_key_pkcs8: Vec<u8>,
}

impl TestKeypair {
    /// Same seed always produces the same keypair.
    pub fn new(seed: u8, kid: &str) -> Self {
        let seed_bytes = seed_bytes(seed);

        let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes)
            .expect("Failed to create test keypair");

        Self {
            kid: kid.to_string(),
            public_key_bytes: key_pair.public_key().as_ref().to_vec(),
            private_key_pkcs8: build_pkcs8_from_seed(&seed_bytes),
        }
    }

    /// Sign `claims` with this key, putting `kid` in the header.
    pub fn sign(&self, claims: &Value) -> String {
        self.sign_with_kid(Some(&self.kid), claims)
    }

    /// Sign `claims` with an arbitrary header `kid` (or none at all).
    pub fn sign_with_kid(&self, kid: Option<&str>, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::EdDSA);
        header.typ = Some("JWT".to_string());
        header.kid = kid.map(ToString::to_string);

        let encoding_key = EncodingKey::from_ed_der(&self.private_key_pkcs8);
        encode(&header, claims, &encoding_key).expect("Failed to sign test token")
    }

    /// Public JWK for this key, declaring `alg: EdDSA`.
    pub fn jwk(&self) -> Value {
        json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "x": self.public_x(),
            "kid": self.kid,
            "alg": "EdDSA",
            "use": "sig"
        })
    }

    /// Public JWK for this key with no `alg` constraint.
    pub fn jwk_without_alg(&self) -> Value {
        json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "x": self.public_x(),
            "kid": self.kid
        })
    }

    /// Base64url-encoded public key (the JWK `x` member).
    pub fn public_x(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.public_key_bytes)
    }
}

/// HMAC-SHA256 secret with a key id.
pub struct TestHmacKey {
    pub kid: String,
    secret: Vec<u8>,
}

impl TestHmacKey {
    pub fn new(kid: &str, secret: &[u8]) -> Self {
        Self {
            kid: kid.to_string(),
            secret: secret.to_vec(),
        }
    }

    /// Sign `claims` with HS256.
    pub fn sign(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(self.kid.clone());

        encode(&header, claims, &EncodingKey::from_secret(&self.secret))
            .expect("Failed to sign test token")
    }

    /// Symmetric JWK for this secret, declaring `alg: HS256`.
    pub fn jwk(&self) -> Value {
        json!({
            "kty": "oct",
            "k": URL_SAFE_NO_PAD.encode(&self.secret),
            "kid": self.kid,
            "alg": "HS256"
        })
    }
}

/// Serialize JWKs into a JWKS document.
pub fn jwks_json(keys: &[Value]) -> String {
    json!({ "keys": keys }).to_string()
}

/// Build a compact token from raw header and payload JSON with a dummy
/// signature. Useful for exercising parsing failures.
pub fn unsigned_token(header: &Value, claims: &Value) -> String {
    format!(
        "{}.{}.c2lnbmF0dXJl",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

fn seed_bytes(seed: u8) -> [u8; 32] {
    let mut seed_bytes = [0u8; 32];
    seed_bytes[0] = seed;
    for (i, byte) in seed_bytes.iter_mut().enumerate().skip(1) {
        *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
    }
    seed_bytes
}

/// PKCS#8 v1 document (RFC 5208) wrapping a raw Ed25519 seed.
///
/// Test-only: ring does not expose PKCS#8 for keys built from a seed.
fn build_pkcs8_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    let mut pkcs8 = Vec::with_capacity(48);

    // SEQUENCE, 46 bytes
    pkcs8.extend_from_slice(&[0x30, 0x2e]);
    // version INTEGER 0
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x00]);
    // AlgorithmIdentifier SEQUENCE { OID 1.3.101.112 }
    pkcs8.extend_from_slice(&[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70]);
    // privateKey OCTET STRING { OCTET STRING seed }
    pkcs8.extend_from_slice(&[0x04, 0x22, 0x04, 0x20]);
    pkcs8.extend_from_slice(seed);

    pkcs8
}
