//! Observability module for jwt-gate.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
