//! Services for jwt-gate.
//!
//! - `upstream` - reverse-proxy client for the protected service

pub mod upstream;

pub use upstream::UpstreamClient;
