//! Observability for the token library
//!
//! Instrumented functions use `#[instrument(skip_all)]` and add fields
//! explicitly. Fields fall into three groups:
//! - **SAFE**: Can be logged in plaintext (error reasons, key aliases, counts)
//! - **HASHED**: Must be SHA-256 hashed for correlation (`jti`, `sub`)
//! - **NEVER**: Must never appear in logs (tokens, private keys, passphrases)
//!
//! Metrics are emitted through the `metrics` facade. Nothing is recorded
//! unless the host process installs a recorder.

pub mod metrics;

use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars)
///
/// Used for token identifiers and subjects that need correlation across log
/// entries but should not be stored in plaintext.
///
/// # Privacy
///
/// This is a one-way hash for correlation only, not a secret-protection
/// mechanism. Truncation keeps enough uniqueness for debugging.
pub fn hash_for_correlation(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let result = hasher.finalize();
    hex::encode(result.get(..4).unwrap_or_default())
}
