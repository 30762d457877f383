//! Token authentication and authorization.
//!
//! # Components
//!
//! - `extract` - finds a bearer token in the request
//! - `jwks` - per-path verification key sets
//! - `jwt` - signature and validity-window checks
//! - `claims` - validated claim values and header propagation
//! - `authorize` - allow/deny predicate evaluation

pub mod authorize;
pub mod claims;
pub mod extract;
pub mod jwks;
pub mod jwt;

pub use authorize::authorize;
pub use claims::{ClaimValue, Claims};
pub use extract::extract_token;
pub use jwks::{KeySet, KeySetError};
pub use jwt::TokenValidator;
