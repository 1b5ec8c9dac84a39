//! Token payload model.
//!
//! Registered claims are optional on the wire so that inbound tokens from any
//! issuer can be parsed; the verifier enforces which ones must be present.
//! Claims built by the signer always carry `iss`, `aud`, `exp`, `nbf`, `iat`
//! and `jti`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Custom claim carrying the issuer's token format version.
pub const VERSION_CLAIM: &str = "version";

/// The `aud` claim: a single audience string or an array of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    /// Build an audience from a list, collapsing a single entry to a string.
    ///
    /// Returns `None` for an empty list.
    pub fn from_list(mut audiences: Vec<String>) -> Option<Self> {
        match audiences.len() {
            0 => None,
            1 => audiences.pop().map(Audience::Single),
            _ => Some(Audience::Multiple(audiences)),
        }
    }

    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Audience::Single(value) => value == audience,
            Audience::Multiple(values) => values.iter().any(|v| v == audience),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            Audience::Single(value) => std::slice::from_ref(value),
            Audience::Multiple(values) => values,
        };
        values.iter().map(String::as_str)
    }
}

/// JWT claims.
///
/// `sub` and `jti` identify the caller and the individual token; they are
/// redacted in Debug output.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Audience
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,

    /// Subject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Expiration timestamp (Unix epoch seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Not-before timestamp (Unix epoch seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Issued-at timestamp (Unix epoch seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Unique token identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// Non-registered claims, e.g. `version`.
    #[serde(flatten)]
    pub custom: Map<String, Value>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("sub", &self.sub.as_ref().map(|_| "[REDACTED]"))
            .field("exp", &self.exp)
            .field("nbf", &self.nbf)
            .field("iat", &self.iat)
            .field("jti", &self.jti.as_ref().map(|_| "[REDACTED]"))
            .field("custom", &self.custom)
            .finish()
    }
}

impl Claims {
    /// True if `aud` names the given audience.
    ///
    /// The verifier does not check audience; services call this on the
    /// returned claims to apply their own policy.
    pub fn has_audience(&self, audience: &str) -> bool {
        self.aud.as_ref().is_some_and(|aud| aud.contains(audience))
    }

    /// True if `iss` equals the given issuer.
    pub fn issued_by(&self, issuer: &str) -> bool {
        self.iss.as_deref() == Some(issuer)
    }

    pub fn custom_claim(&self, name: &str) -> Option<&Value> {
        self.custom.get(name)
    }

    pub fn set_custom_claim(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.custom.insert(name.into(), value.into());
    }

    /// The `version` custom claim, if present and a string.
    pub fn version(&self) -> Option<&str> {
        self.custom_claim(VERSION_CLAIM).and_then(Value::as_str)
    }

    /// Apply claim overrides on top of these claims.
    ///
    /// Registered claim names replace the corresponding field (a JSON `null`
    /// clears it); any other name becomes a custom claim.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if an override has the wrong type for a
    /// registered claim (e.g. a string `exp`).
    pub fn merged_with(self, overrides: Map<String, Value>) -> Result<Self, serde_json::Error> {
        let mut object = match serde_json::to_value(self)? {
            Value::Object(object) => object,
            _ => Map::new(),
        };
        object.extend(overrides);
        serde_json::from_value(Value::Object(object))
    }
}
