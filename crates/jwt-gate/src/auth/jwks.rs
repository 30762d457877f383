//! Verification key sets.
//!
//! A `KeySet` is the parsed form of a JSON Web Key Set file. Each protected
//! path owns exactly one key set; it is built at configuration load time and
//! never mutated afterwards, so request handlers read it without locking.
//!
//! # Security
//!
//! - Lookup is by exact `kid` match only; there is no "try every key" path
//! - When several keys share a `kid`, the first one in file order wins
//! - Debug output lists key ids, never key material

use jsonwebtoken::jwk::{Jwk, JwkSet};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading a key set file.
#[derive(Debug, Error)]
pub enum KeySetError {
    #[error("Failed to read key file `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON Web Key Set in `{path}`: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Immutable, ordered collection of verification keys.
#[derive(Clone, Default)]
pub struct KeySet {
    keys: Vec<Jwk>,
}

impl KeySet {
    /// Create a key set from already-parsed JWKs, keeping their order.
    pub fn new(keys: Vec<Jwk>) -> Self {
        Self { keys }
    }

    /// A key set that resolves no key id.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a JWKS document (`{"keys": [...]}`).
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let jwks: JwkSet = serde_json::from_str(json)?;
        Ok(Self::from(jwks))
    }

    /// Read and parse a JWKS file.
    ///
    /// # Errors
    ///
    /// Returns `KeySetError::Io` if the file cannot be read and
    /// `KeySetError::Json` if it is not a valid JWKS document.
    pub fn load(path: &Path) -> Result<Self, KeySetError> {
        let contents = std::fs::read_to_string(path).map_err(|source| KeySetError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let keys = Self::from_json(&contents).map_err(|source| KeySetError::Json {
            path: path.display().to_string(),
            source,
        })?;

        tracing::info!(
            target: "jwt_gate.auth.jwks",
            path = %path.display(),
            key_count = keys.len(),
            "Loaded key set"
        );

        Ok(keys)
    }

    /// Find the first key whose `kid` equals `kid`.
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys
            .iter()
            .find(|key| key.common.key_id.as_deref() == Some(kid))
    }

    /// Number of keys in the set.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Key ids in file order (keys without a `kid` are skipped).
    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.keys
            .iter()
            .filter_map(|key| key.common.key_id.as_deref())
    }
}

impl From<JwkSet> for KeySet {
    fn from(jwks: JwkSet) -> Self {
        Self::new(jwks.keys)
    }
}

/// Lists key ids only; symmetric keys must never reach the logs.
impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySet")
            .field("key_ids", &self.key_ids().collect::<Vec<_>>())
            .finish()
    }
}
