//! Custom test assertions for expressive tests
//!
//! Provides trait-based assertions for issued tokens.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use serde_json::{Map, Value};

/// JWT header structure
#[derive(Debug, Deserialize)]
struct JwtHeader {
    pub alg: String,
    pub typ: String,
    #[serde(default)]
    pub kid: Option<String>,
}

fn segment(token: &str, index: usize) -> Vec<u8> {
    let part = token
        .split('.')
        .nth(index)
        .unwrap_or_else(|| panic!("JWT is missing segment {index}"));
    URL_SAFE_NO_PAD
        .decode(part)
        .unwrap_or_else(|e| panic!("Failed to base64 decode JWT segment {index}: {e}"))
}

fn header(token: &str) -> JwtHeader {
    serde_json::from_slice(&segment(token, 0)).expect("Failed to parse JWT header")
}

fn claims(token: &str) -> Map<String, Value> {
    serde_json::from_slice(&segment(token, 1)).expect("Failed to parse JWT claims")
}

/// Custom assertions for issued tokens
///
/// # Example
/// ```rust,ignore
/// token
///     .assert_valid_jwt()
///     .assert_signed_by("selfsigned")
///     .assert_has_claim("version", "1.0");
/// ```
pub trait TokenAssertions {
    /// Assert that the token is a compact EdDSA JWT with an object payload
    fn assert_valid_jwt(&self) -> &Self;

    /// Assert that the token header names the specified key
    fn assert_signed_by(&self, key_id: &str) -> &Self;

    /// Assert that the token expires within the specified seconds
    fn assert_expires_in(&self, seconds: u64) -> &Self;

    /// Assert that the token is for the specified subject
    fn assert_for_subject(&self, subject: &str) -> &Self;

    /// Assert that a claim has the given value
    fn assert_has_claim(&self, name: &str, value: impl Into<Value>) -> &Self;
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self) -> &Self {
        let parts = self.split('.').count();
        assert_eq!(
            parts, 3,
            "JWT must have 3 parts (header.payload.signature), got {parts}"
        );

        let header = header(self);
        assert_eq!(header.alg, "EdDSA", "Expected EdDSA algorithm");
        assert_eq!(header.typ, "JWT", "Expected JWT type");

        claims(self);
        assert!(
            !segment(self, 2).is_empty(),
            "JWT signature must not be empty"
        );

        self
    }

    fn assert_signed_by(&self, key_id: &str) -> &Self {
        let kid = header(self).kid;
        assert_eq!(
            kid.as_deref(),
            Some(key_id),
            "Expected key_id '{key_id}', got {kid:?}"
        );

        self
    }

    fn assert_expires_in(&self, seconds: u64) -> &Self {
        let exp = claims(self)
            .get("exp")
            .and_then(Value::as_i64)
            .expect("JWT has no numeric exp claim");

        let expires_in = exp - chrono::Utc::now().timestamp();

        // Allow 5-second tolerance for slow test runs
        assert!(
            (expires_in - seconds as i64).abs() <= 5,
            "Expected token to expire in {seconds} seconds, but expires in {expires_in} seconds"
        );

        self
    }

    fn assert_for_subject(&self, subject: &str) -> &Self {
        let claims = claims(self);
        assert_eq!(
            claims.get("sub").and_then(Value::as_str),
            Some(subject),
            "Expected subject '{subject}', got {:?}",
            claims.get("sub")
        );

        self
    }

    fn assert_has_claim(&self, name: &str, value: impl Into<Value>) -> &Self {
        let expected = value.into();
        let claims = claims(self);
        assert_eq!(
            claims.get(name),
            Some(&expected),
            "Expected claim '{name}' to be {expected}"
        );

        self
    }
}
