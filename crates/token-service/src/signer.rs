//! Token issuance.
//!
//! The signer builds default claims from configuration and signs them with
//! an Ed25519 key unsealed from the keystore. Its key can be replaced while
//! other threads are signing; each signature uses one key snapshot.

use crate::claims::{Audience, Claims, VERSION_CLAIM};
use crate::config::{Config, KeystoreConfig};
use crate::crypto;
use crate::errors::{CryptoError, SignerError};
use crate::keystore::KeyStore;
use crate::observability::{hash_for_correlation, metrics};
use arc_swap::ArcSwap;
use chrono::Utc;
use common::secret::{ExposeSecret, SecretBox};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// How far `nbf` is back-dated from the issue time.
pub const NOT_BEFORE_SKEW_MINUTES: i64 = 2;

/// Ed25519 private key used for signing, with the `kid` advertised in the
/// token header.
pub struct SigningKey {
    key_id: String,
    pkcs8: SecretBox<Vec<u8>>,
}

impl SigningKey {
    /// Wrap an Ed25519 PKCS#8 document.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError` if the document is not an Ed25519 private key.
    pub fn from_pkcs8(key_id: impl Into<String>, pkcs8: &[u8]) -> Result<Self, CryptoError> {
        crypto::ed25519_public_key(pkcs8)?;
        Ok(Self {
            key_id: key_id.into(),
            pkcs8: SecretBox::new(Box::new(pkcs8.to_vec())),
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub(crate) fn pkcs8(&self) -> &[u8] {
        self.pkcs8.expose_secret()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .field("pkcs8", &"[REDACTED]")
            .finish()
    }
}

/// Values every issued token starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimDefaults {
    pub issuer: String,
    pub audience: Audience,
    pub expiration_minutes: i64,
    pub version: String,
}

impl ClaimDefaults {
    pub fn from_config(config: &Config) -> Self {
        Self {
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            expiration_minutes: config.expiration_minutes,
            version: config.version.clone(),
        }
    }
}

#[derive(Debug)]
pub struct TokenSigner {
    key: ArcSwap<SigningKey>,
    defaults: ClaimDefaults,
}

impl TokenSigner {
    pub fn new(key: SigningKey, defaults: ClaimDefaults) -> Self {
        Self {
            key: ArcSwap::from_pointee(key),
            defaults,
        }
    }

    /// Build a signer from the configured keystore.
    ///
    /// # Errors
    ///
    /// Returns `SignerError::KeyUnavailable` if no keystore is configured or
    /// the key cannot be unsealed.
    #[instrument(skip_all)]
    pub fn from_config(config: &Config) -> Result<Self, SignerError> {
        let key = load_signing_key(config)?;
        info!(target: "token.signer", key_id = %key.key_id(), "Token signer initialized");
        Ok(Self::new(key, ClaimDefaults::from_config(config)))
    }

    pub fn defaults(&self) -> &ClaimDefaults {
        &self.defaults
    }

    /// `kid` of the key currently used for signing.
    pub fn key_id(&self) -> String {
        self.key.load().key_id().to_string()
    }

    /// Default claims for a token issued now.
    pub fn default_claims(&self) -> Claims {
        self.default_claims_at(Utc::now().timestamp())
    }

    /// Default claims for a token issued at `now` (Unix epoch seconds).
    pub fn default_claims_at(&self, now: i64) -> Claims {
        let mut claims = Claims {
            iss: Some(self.defaults.issuer.clone()),
            aud: Some(self.defaults.audience.clone()),
            sub: None,
            exp: Some(now.saturating_add(self.defaults.expiration_minutes.saturating_mul(60))),
            nbf: Some(now.saturating_sub(NOT_BEFORE_SKEW_MINUTES * 60)),
            iat: Some(now),
            jti: Some(uuid::Uuid::new_v4().to_string()),
            custom: Map::new(),
        };
        claims.set_custom_claim(VERSION_CLAIM, self.defaults.version.clone());
        claims
    }

    /// Issue a token from the default claims with `overrides` applied.
    ///
    /// # Errors
    ///
    /// - `SignerError::InvalidClaims` - An override has the wrong type for a
    ///   registered claim
    /// - `SignerError::Signing` - Signing failed
    #[instrument(skip_all, fields(overrides = overrides.len()))]
    pub fn issue(&self, overrides: Map<String, Value>) -> Result<String, SignerError> {
        let claims = self.default_claims().merged_with(overrides).map_err(|e| {
            debug!(target: "token.signer", error = %e, "Rejected claim overrides");
            metrics::record_token_issuance("error", std::time::Duration::ZERO);
            SignerError::InvalidClaims(e.to_string())
        })?;

        self.sign(&claims)
    }

    /// Sign an explicit claim set with EdDSA.
    #[instrument(skip_all)]
    pub fn sign(&self, claims: &Claims) -> Result<String, SignerError> {
        let start = Instant::now();
        let key = self.key.load();

        let mut header = Header::new(Algorithm::EdDSA);
        header.typ = Some("JWT".to_string());
        header.kid = Some(key.key_id().to_string());

        let encoding_key = EncodingKey::from_ed_der(key.pkcs8());
        let result = encode(&header, claims, &encoding_key)
            .map_err(|e| SignerError::Signing(e.to_string()));

        match &result {
            Ok(_) => {
                metrics::record_token_issuance("success", start.elapsed());
                debug!(
                    target: "token.signer",
                    key_id = %key.key_id(),
                    jti = %claims.jti.as_deref().map(hash_for_correlation).unwrap_or_default(),
                    "Issued token"
                );
            }
            Err(e) => {
                metrics::record_token_issuance("error", start.elapsed());
                warn!(target: "token.signer", key_id = %key.key_id(), error = %e, "Token signing failed");
            }
        }

        result
    }

    /// Replace the signing key.
    ///
    /// Concurrent `sign` calls finish with whichever key they loaded.
    pub fn refresh(&self, key: SigningKey) {
        info!(target: "token.signer", key_id = %key.key_id(), "Signing key refreshed");
        self.key.store(Arc::new(key));
        metrics::record_signing_key_refresh("success");
    }

    /// Re-read the configured keystore and swap in its key.
    ///
    /// On failure the current key stays in place.
    #[instrument(skip_all)]
    pub fn reload(&self, config: &Config) -> Result<(), SignerError> {
        match load_signing_key(config) {
            Ok(key) => {
                self.refresh(key);
                Ok(())
            }
            Err(e) => {
                warn!(target: "token.signer", error = %e, "Signing key reload failed; keeping current key");
                metrics::record_signing_key_refresh("error");
                Err(e)
            }
        }
    }
}

fn load_signing_key(config: &Config) -> Result<SigningKey, SignerError> {
    let KeystoreConfig {
        path,
        passphrase,
        alias,
    } = config
        .keystore
        .as_ref()
        .ok_or_else(|| SignerError::KeyUnavailable("no keystore configured".to_string()))?;

    KeyStore::load(path)
        .and_then(|store| store.unseal(alias, passphrase))
        .map_err(|e| SignerError::KeyUnavailable(e.to_string()))
}
