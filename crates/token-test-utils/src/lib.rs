//! # Token Test Utilities
//!
//! Shared test utilities for the token service.
//!
//! This crate provides:
//! - Key and certificate fixtures (Ed25519 keys with self-signed certificates)
//! - Sealed keystore fixtures
//! - Claim builders (`TestClaimsBuilder`)
//! - Custom assertions (`TokenAssertions` trait)
//! - Test log output (`init_test_tracing`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use token_test_utils::*;
//!
//! #[test]
//! fn test_example() {
//!     let identity = TestIdentity::generate("primary")?;
//!
//!     let token = identity.sign(&TestClaimsBuilder::new().for_subject("billing").build());
//!
//!     token.assert_valid_jwt()
//!          .assert_signed_by("primary")
//!          .assert_for_subject("billing");
//! }
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod logging;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use crypto_fixtures::*;
pub use logging::*;
pub use token_builders::*;
