//! Common utilities shared across jwt-gate crates.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (header decoding, time-window checks, constants)
pub mod jwt;
