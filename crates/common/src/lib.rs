//! Common utilities and types shared across the token service crates.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (structure parsing, size limits, clock skew)
pub mod jwt;
