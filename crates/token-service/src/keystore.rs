//! Passphrase-protected signing key container.
//!
//! A keystore is a JSON document mapping aliases to sealed Ed25519 PKCS#8
//! private keys:
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": {
//!     "selfsigned": {
//!       "kdf": "pbkdf2-hmac-sha256",
//!       "iterations": 100000,
//!       "salt": "<base64>",
//!       "nonce": "<base64>",
//!       "tag": "<base64>",
//!       "ciphertext": "<base64>"
//!     }
//!   }
//! }
//! ```
//!
//! Each entry has its own salt, so the same passphrase yields a different
//! wrapping key per entry. The wrapping key never leaves [`crypto`].

use crate::crypto::{self, EncryptedKey};
use crate::signer::SigningKey;
use base64::{engine::general_purpose, Engine as _};
use common::secret::{ExposeSecret, SecretBox, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub const KEYSTORE_VERSION: u32 = 1;

pub const KDF_PBKDF2_HMAC_SHA256: &str = "pbkdf2-hmac-sha256";

pub const DEFAULT_KDF_ITERATIONS: u32 = 100_000;

/// Entries sealed with fewer PBKDF2 iterations are refused on load.
pub const MIN_KDF_ITERATIONS: u32 = 10_000;

const SALT_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("Keystore not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to access keystore {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid keystore format: {0}")]
    Format(String),

    #[error("Unsupported keystore version: {0}")]
    UnsupportedVersion(u32),

    #[error("Alias not found in keystore: {0}")]
    AliasNotFound(String),

    /// Wrong passphrase, or the entry was modified.
    #[error("Failed to unseal keystore entry {0}")]
    Decryption(String),

    #[error("Keystore entry {alias} does not hold an Ed25519 key: {reason}")]
    InvalidKey { alias: String, reason: String },

    #[error("Keystore entry {alias} uses too few KDF iterations: {iterations}")]
    WeakKdf { alias: String, iterations: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SealedEntry {
    kdf: String,
    iterations: u32,
    salt: String,
    nonce: String,
    tag: String,
    ciphertext: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct KeyStoreFile {
    version: u32,
    #[serde(default)]
    entries: BTreeMap<String, SealedEntry>,
}

/// Signing keys sealed under a passphrase, keyed by alias.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyStore {
    entries: BTreeMap<String, SealedEntry>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a keystore file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KeyStoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                KeyStoreError::NotFound(path.to_path_buf())
            } else {
                KeyStoreError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let store = Self::from_json(&raw)?;
        debug!(target: "token.keystore", entries = store.entries.len(), "Loaded keystore");
        Ok(store)
    }

    pub fn from_json(raw: &str) -> Result<Self, KeyStoreError> {
        let file: KeyStoreFile =
            serde_json::from_str(raw).map_err(|e| KeyStoreError::Format(e.to_string()))?;

        if file.version != KEYSTORE_VERSION {
            return Err(KeyStoreError::UnsupportedVersion(file.version));
        }

        for (alias, entry) in &file.entries {
            if entry.kdf != KDF_PBKDF2_HMAC_SHA256 {
                return Err(KeyStoreError::Format(format!(
                    "entry {alias} uses unsupported KDF {}",
                    entry.kdf
                )));
            }
            if entry.iterations < MIN_KDF_ITERATIONS {
                return Err(KeyStoreError::WeakKdf {
                    alias: alias.clone(),
                    iterations: entry.iterations,
                });
            }
        }

        Ok(Self {
            entries: file.entries,
        })
    }

    pub fn to_json(&self) -> Result<String, KeyStoreError> {
        let file = KeyStoreFile {
            version: KEYSTORE_VERSION,
            entries: self.entries.clone(),
        };
        serde_json::to_string_pretty(&file).map_err(|e| KeyStoreError::Format(e.to_string()))
    }

    /// Write the keystore, replacing any existing file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), KeyStoreError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?).map_err(|source| KeyStoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        info!(target: "token.keystore", entries = self.entries.len(), "Saved keystore");
        Ok(())
    }

    /// Aliases in sorted order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.entries.contains_key(alias)
    }

    /// Seal `pkcs8` under `passphrase` and store it as `alias`.
    ///
    /// Replaces an existing entry with the same alias.
    pub fn insert(
        &mut self,
        alias: &str,
        pkcs8: &[u8],
        passphrase: &SecretString,
    ) -> Result<(), KeyStoreError> {
        self.insert_with_iterations(alias, pkcs8, passphrase, DEFAULT_KDF_ITERATIONS)
    }

    #[instrument(skip(self, pkcs8, passphrase))]
    pub fn insert_with_iterations(
        &mut self,
        alias: &str,
        pkcs8: &[u8],
        passphrase: &SecretString,
        iterations: u32,
    ) -> Result<(), KeyStoreError> {
        let rounds = NonZeroU32::new(iterations)
            .filter(|n| n.get() >= MIN_KDF_ITERATIONS)
            .ok_or_else(|| KeyStoreError::WeakKdf {
                alias: alias.to_string(),
                iterations,
            })?;

        crypto::ed25519_public_key(pkcs8).map_err(|e| KeyStoreError::InvalidKey {
            alias: alias.to_string(),
            reason: e.to_string(),
        })?;

        let salt = crypto::generate_random_bytes(SALT_LEN)
            .map_err(|e| KeyStoreError::Format(e.to_string()))?;
        let wrapping_key = crypto::derive_wrapping_key(passphrase, &salt, rounds);
        let sealed = crypto::encrypt_private_key(pkcs8, wrapping_key.expose_secret())
            .map_err(|e| KeyStoreError::Format(e.to_string()))?;

        let entry = SealedEntry {
            kdf: KDF_PBKDF2_HMAC_SHA256.to_string(),
            iterations,
            salt: general_purpose::STANDARD.encode(&salt),
            nonce: general_purpose::STANDARD.encode(&sealed.nonce),
            tag: general_purpose::STANDARD.encode(&sealed.tag),
            ciphertext: general_purpose::STANDARD.encode(sealed.encrypted_data.expose_secret()),
        };

        if self.entries.insert(alias.to_string(), entry).is_some() {
            warn!(target: "token.keystore", alias = %alias, "Replaced existing keystore entry");
        }
        Ok(())
    }

    /// Decrypt the entry for `alias` into a signing key whose `kid` is the alias.
    #[instrument(skip(self, passphrase))]
    pub fn unseal(
        &self,
        alias: &str,
        passphrase: &SecretString,
    ) -> Result<SigningKey, KeyStoreError> {
        let entry = self
            .entries
            .get(alias)
            .ok_or_else(|| KeyStoreError::AliasNotFound(alias.to_string()))?;

        let rounds = NonZeroU32::new(entry.iterations)
            .filter(|n| n.get() >= MIN_KDF_ITERATIONS)
            .ok_or_else(|| KeyStoreError::WeakKdf {
                alias: alias.to_string(),
                iterations: entry.iterations,
            })?;

        let decode = |field: &str, value: &str| {
            general_purpose::STANDARD
                .decode(value)
                .map_err(|e| KeyStoreError::Format(format!("entry {alias} field {field}: {e}")))
        };
        let salt = decode("salt", &entry.salt)?;
        let sealed = EncryptedKey {
            encrypted_data: SecretBox::new(Box::new(decode("ciphertext", &entry.ciphertext)?)),
            nonce: decode("nonce", &entry.nonce)?,
            tag: decode("tag", &entry.tag)?,
        };

        let wrapping_key = crypto::derive_wrapping_key(passphrase, &salt, rounds);
        let pkcs8 = crypto::decrypt_private_key(&sealed, wrapping_key.expose_secret())
            .map_err(|_| KeyStoreError::Decryption(alias.to_string()))?;

        SigningKey::from_pkcs8(alias, pkcs8.expose_secret()).map_err(|e| {
            KeyStoreError::InvalidKey {
                alias: alias.to_string(),
                reason: e.to_string(),
            }
        })
    }
}
