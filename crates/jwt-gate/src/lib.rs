//! jwt-gate Library
//!
//! An HTTP authentication gate that sits in front of a single upstream
//! service. Path-scoped rules decide which requests need a signed JWT,
//! which keys may sign it, and which claims it must carry.
//!
//! - Token extraction from the `Authorization` header, the `jwt_token`
//!   cookie or the `token` query parameter
//! - Signature and time-window validation against per-rule JWKS files
//! - Claim predicates combined with OR semantics
//! - Validated claims forwarded upstream as `Token-Claim-*` headers
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/gate.rs -> handlers/proxy.rs -> services/upstream.rs
//!                        |
//!                        +-> auth/* (extract, validate, authorize)
//!                        +-> rules/* (rule table built by the loader)
//! ```
//!
//! # Modules
//!
//! - `auth` - Token extraction, validation, claims and authorization
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Gate layer and HTTP metrics middleware
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup
//! - `rules` - Rule model and directive file loader
//! - `services` - Upstream HTTP client

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod rules;
pub mod services;
