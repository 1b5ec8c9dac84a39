use crate::claims::Audience;
use common::jwt::MAX_CLOCK_SKEW;
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default token lifetime in minutes.
pub const DEFAULT_EXPIRATION_MINUTES: i64 = 10;

/// Longest token lifetime accepted from configuration (one day).
pub const MAX_EXPIRATION_MINUTES: i64 = 1440;

/// Default value of the `version` custom claim.
pub const DEFAULT_TOKEN_VERSION: &str = "1.0";

/// Default clock skew tolerance applied by the verifier.
pub const DEFAULT_CLOCK_SKEW_SECONDS: u64 = 60;

/// Default keystore alias of the signing key.
pub const DEFAULT_KEY_ALIAS: &str = "selfsigned";

#[derive(Debug, Clone)]
pub struct Config {
    pub issuer: String,
    pub audience: Audience,
    pub expiration_minutes: i64,
    pub version: String,
    pub clock_skew: Duration,
    /// Trusted certificate files, in trial order.
    pub trusted_certificates: Vec<PathBuf>,
    /// Signing key location; `None` on verify-only hosts.
    pub keystore: Option<KeystoreConfig>,
}

/// Where the signer finds its private key.
#[derive(Debug, Clone)]
pub struct KeystoreConfig {
    pub path: PathBuf,
    pub passphrase: SecretString,
    pub alias: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let issuer = required(vars, "TOKEN_ISSUER")?;

        let audience = Audience::from_list(split_list(&required(vars, "TOKEN_AUDIENCE")?))
            .ok_or_else(|| invalid("TOKEN_AUDIENCE", "at least one audience is required"))?;

        let expiration_minutes = match vars.get("TOKEN_EXPIRATION_MINUTES") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map_err(|e| invalid("TOKEN_EXPIRATION_MINUTES", &e.to_string()))?,
            None => DEFAULT_EXPIRATION_MINUTES,
        };
        if !(1..=MAX_EXPIRATION_MINUTES).contains(&expiration_minutes) {
            return Err(invalid(
                "TOKEN_EXPIRATION_MINUTES",
                &format!("must be between 1 and {MAX_EXPIRATION_MINUTES}, got {expiration_minutes}"),
            ));
        }

        let version = vars
            .get("TOKEN_VERSION")
            .cloned()
            .unwrap_or_else(|| DEFAULT_TOKEN_VERSION.to_string());

        let clock_skew_seconds = match vars.get("TOKEN_CLOCK_SKEW_SECONDS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|e| invalid("TOKEN_CLOCK_SKEW_SECONDS", &e.to_string()))?,
            None => DEFAULT_CLOCK_SKEW_SECONDS,
        };
        if clock_skew_seconds > MAX_CLOCK_SKEW.as_secs() {
            return Err(invalid(
                "TOKEN_CLOCK_SKEW_SECONDS",
                &format!(
                    "must be at most {} seconds, got {clock_skew_seconds}",
                    MAX_CLOCK_SKEW.as_secs()
                ),
            ));
        }

        let trusted_certificates = vars
            .get("TOKEN_TRUSTED_CERTIFICATES")
            .map(|raw| split_list(raw).into_iter().map(PathBuf::from).collect())
            .unwrap_or_default();

        let keystore = match vars.get("TOKEN_KEYSTORE_PATH") {
            Some(path) if !path.trim().is_empty() => {
                let passphrase = required(vars, "TOKEN_KEYSTORE_PASSPHRASE")?;
                let alias = vars
                    .get("TOKEN_KEY_ALIAS")
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_KEY_ALIAS.to_string());
                Some(KeystoreConfig {
                    path: PathBuf::from(path.trim()),
                    passphrase: SecretString::from(passphrase),
                    alias,
                })
            }
            _ => None,
        };

        Ok(Config {
            issuer,
            audience,
            expiration_minutes,
            version,
            clock_skew: Duration::from_secs(clock_skew_seconds),
            trusted_certificates,
            keystore,
        })
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn invalid(var: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        var: var.to_string(),
        reason: reason.to_string(),
    }
}

/// Split a comma-separated list, dropping blank entries and keeping order.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}
