//! JWT structure utilities shared by the token crates.
//!
//! This module provides the parts of JWT handling that do not depend on any
//! key material:
//! - Size limits for DoS prevention
//! - Clock skew constants
//! - Structural parsing of the compact `header.payload.signature` form
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Structural parsing never verifies a signature; callers MUST verify the
//!   signature before trusting anything in the header or payload
//! - Generic error messages prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::split_compact;
//!
//! let parsed = split_compact(token)?;
//! if parsed.algorithm() != Some("EdDSA") {
//!     return Err("unsupported algorithm");
//! }
//! // ... verify parsed.signing_input() against parsed.signature() ...
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this size are rejected BEFORE any parsing or cryptographic
/// operations.
///
/// # Rationale
///
/// - A default service token is ~400 bytes (`EdDSA` sig, registered claims
///   plus a `version` marker)
/// - 8KB leaves room for custom claims while bounding base64 decode cost
///
/// Per OWASP API Security Top 10 - API4:2023 (Unrestricted Resource Consumption)
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default JWT clock skew tolerance (1 minute).
///
/// Applied to the `exp` and `nbf` comparisons to absorb
/// clock drift between issuer and verifier.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(60);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
///
/// Configuration above this value is rejected; a larger window would keep
/// expired tokens usable for too long.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during structural JWT validation.
///
/// Note: Error messages are intentionally generic to prevent information leakage.
/// Detailed information is logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The access token is invalid or expired")]
    MalformedToken,
}

// =============================================================================
// Compact Token
// =============================================================================

/// A structurally valid, NOT yet verified, compact JWT.
///
/// Produced by [`split_compact`]. Borrows the signing input and signature
/// segments from the original token string so that signature verification
/// can run against each trust anchor without re-splitting.
#[derive(Debug, Clone)]
pub struct CompactToken<'a> {
    header: Map<String, Value>,
    payload: Vec<u8>,
    signing_input: &'a str,
    signature: &'a str,
}

impl<'a> CompactToken<'a> {
    /// The decoded JOSE header.
    #[must_use]
    pub fn header(&self) -> &Map<String, Value> {
        &self.header
    }

    /// The `alg` header value, if it is present and a string.
    #[must_use]
    pub fn algorithm(&self) -> Option<&str> {
        self.header.get("alg").and_then(Value::as_str)
    }

    /// The decoded payload bytes (a JSON object).
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The `header.payload` portion covered by the signature.
    #[must_use]
    pub fn signing_input(&self) -> &'a str {
        self.signing_input
    }

    /// The base64url-encoded signature segment.
    #[must_use]
    pub fn signature(&self) -> &'a str {
        self.signature
    }

    /// Deserialize the payload into a claims type.
    ///
    /// # Errors
    ///
    /// Returns `JwtValidationError::MalformedToken` if the payload does not
    /// match the shape of `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, JwtValidationError> {
        serde_json::from_slice(&self.payload).map_err(|e| {
            tracing::debug!(target: "common.jwt", error = %e, "Failed to deserialize JWT claims");
            JwtValidationError::MalformedToken
        })
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Split a compact JWT into its decoded parts without verifying the signature.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing (denial-of-service prevention)
/// - This function does NOT validate the token signature
/// - The header `alg` is returned as-is; callers MUST pin it to the single
///   algorithm they accept before verifying
///
/// An empty signature segment is structurally allowed so that unsigned
/// (`alg: none`) tokens reach the caller's algorithm check and are rejected
/// there with a precise reason.
///
/// # Errors
///
/// Returns `JwtValidationError` variants:
/// - `TokenTooLarge` - Token exceeds size limit (denial-of-service protection)
/// - `MalformedToken` - Wrong segment count, empty header or payload, bad
///   base64url, or a header/payload that is not a JSON object
pub fn split_compact(token: &str) -> Result<CompactToken<'_>, JwtValidationError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let segments = token.split('.').count();
    if segments != 3 {
        tracing::debug!(
            target: "common.jwt",
            parts = segments,
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    let (signing_input, signature) = token
        .rsplit_once('.')
        .ok_or(JwtValidationError::MalformedToken)?;
    let (header_part, payload_part) = signing_input
        .split_once('.')
        .ok_or(JwtValidationError::MalformedToken)?;

    if header_part.is_empty() || payload_part.is_empty() {
        tracing::debug!(target: "common.jwt", "Token rejected: empty header or payload segment");
        return Err(JwtValidationError::MalformedToken);
    }

    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: Map<String, Value> = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    let payload = URL_SAFE_NO_PAD.decode(payload_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT payload base64");
        JwtValidationError::MalformedToken
    })?;

    // Payload must be a JSON object; the concrete claims shape is checked later.
    if serde_json::from_slice::<Map<String, Value>>(&payload).is_err() {
        tracing::debug!(target: "common.jwt", "Failed to parse JWT payload JSON object");
        return Err(JwtValidationError::MalformedToken);
    }

    URL_SAFE_NO_PAD.decode(signature).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT signature base64");
        JwtValidationError::MalformedToken
    })?;

    Ok(CompactToken {
        header,
        payload,
        signing_input,
        signature,
    })
}

// =============================================================================
// Tests
// =============================================================================
