//! # Gate Test Utilities
//!
//! Shared test fixtures for jwt-gate.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (Ed25519 and HMAC keys, JWK/JWKS JSON)
//! - Claim builders (TestTokenBuilder)
//! - Scratch files for rule and key-set configuration (TempFile)
//! - A real gate server bound to a random port (TestGateServer)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gate_test_utils::*;
//!
//! let keypair = TestKeypair::new(1, "key-1");
//! let keys = TempFile::with_contents("keys.json", &jwks_json(&[keypair.jwk()]));
//! let token = keypair.sign(&TestTokenBuilder::new().claim("role", "admin").build());
//! ```

pub mod crypto_fixtures;
pub mod server_harness;
pub mod temp_files;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use temp_files::*;
pub use token_builders::*;
