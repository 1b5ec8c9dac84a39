//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. Use these types
//! for every value that must never reach a log line: keystore passphrases,
//! private key documents and anything derived from them.
//!
//! `SecretBox<T>` and `SecretString` implement `Debug` with redaction, so any
//! struct deriving `Debug` that holds one stays safe to print. Secrets are
//! zeroized when dropped.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct KeystoreSettings {
//!     path: String,
//!     passphrase: SecretString,  // Debug shows "[REDACTED]"
//! }
//!
//! let settings = KeystoreSettings {
//!     path: "/config/oauth/primary.keystore.json".to_string(),
//!     passphrase: SecretString::from("password"),
//! };
//!
//! println!("{:?}", settings);
//!
//! // Access requires an explicit call
//! let passphrase: &str = settings.passphrase.expose_secret();
//! ```
//!
//! # Usage Guidelines
//!
//! Use `SecretString` for:
//! - Keystore passphrases
//!
//! Use `SecretBox<T>` for:
//! - Binary key material (e.g., `SecretBox<Vec<u8>>` for PKCS#8 documents)

// Re-export the main types from secrecy
pub use secrecy::{ExposeSecret, SecretBox, SecretString};
