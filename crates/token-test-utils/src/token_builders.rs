//! Builder patterns for test data construction
//!
//! Provides a fluent API for creating token claims, including the invalid
//! shapes verification tests need (expired, not yet valid, no `exp`).

use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};
use token_service::Claims;

use crate::crypto_fixtures::{TEST_AUDIENCE, TEST_ISSUER};

/// Builder for creating test JWT claims
///
/// # Example
/// ```rust,ignore
/// let claims = TestClaimsBuilder::new()
///     .for_subject("billing-service")
///     .expires_in(600)
///     .build();
/// ```
pub struct TestClaimsBuilder {
    iss: String,
    aud: String,
    sub: Option<String>,
    exp: Option<i64>,
    nbf: Option<i64>,
    iat: i64,
    jti: String,
    custom: Map<String, Value>,
}

impl TestClaimsBuilder {
    /// Create a builder for a token valid for ten minutes from now
    pub fn new() -> Self {
        let now = Utc::now();
        let mut custom = Map::new();
        custom.insert("version".to_string(), json!("1.0"));
        Self {
            iss: TEST_ISSUER.to_string(),
            aud: TEST_AUDIENCE.to_string(),
            sub: None,
            exp: Some((now + Duration::minutes(10)).timestamp()),
            nbf: Some((now - Duration::minutes(2)).timestamp()),
            iat: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            custom,
        }
    }

    pub fn issued_by(mut self, issuer: &str) -> Self {
        self.iss = issuer.to_string();
        self
    }

    pub fn for_audience(mut self, audience: &str) -> Self {
        self.aud = audience.to_string();
        self
    }

    pub fn for_subject(mut self, subject: &str) -> Self {
        self.sub = Some(subject.to_string());
        self
    }

    /// Set expiration in seconds from now (negative for the past)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Drop the `exp` claim
    pub fn without_expiration(mut self) -> Self {
        self.exp = None;
        self
    }

    /// Set `nbf` in seconds from now (negative for the past)
    pub fn not_before_in(mut self, seconds: i64) -> Self {
        self.nbf = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    pub fn with_claim(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.custom.insert(name.to_string(), value.into());
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        let mut claims = self.custom;
        claims.insert("iss".to_string(), json!(self.iss));
        claims.insert("aud".to_string(), json!(self.aud));
        claims.insert("iat".to_string(), json!(self.iat));
        claims.insert("jti".to_string(), json!(self.jti));
        if let Some(sub) = self.sub {
            claims.insert("sub".to_string(), json!(sub));
        }
        if let Some(exp) = self.exp {
            claims.insert("exp".to_string(), json!(exp));
        }
        if let Some(nbf) = self.nbf {
            claims.insert("nbf".to_string(), json!(nbf));
        }
        Value::Object(claims)
    }

    /// Build the claims as the library's claims type
    pub fn build_claims(self) -> Claims {
        serde_json::from_value(self.build()).expect("Builder output should be valid claims")
    }
}

impl Default for TestClaimsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
