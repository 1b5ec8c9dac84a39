//! Key, certificate and keystore fixtures
//!
//! Every identity is a fresh Ed25519 key pair with a self-signed certificate
//! over its public key, so trust anchors and signing keys always match.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use common::secret::SecretString;
use jsonwebtoken::{Algorithm, EncodingKey};
use rcgen::{CertificateParams, DnType, KeyPair};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use token_service::keystore::{KeyStore, MIN_KDF_ITERATIONS};
use token_service::{SigningKey, TrustedCertificate};

/// Passphrase used for all keystore fixtures.
pub const TEST_PASSPHRASE: &str = "password";

/// Lowest accepted iteration count keeps keystore fixtures fast.
pub const TEST_KDF_ITERATIONS: u32 = MIN_KDF_ITERATIONS;

pub const TEST_ISSUER: &str = "urn:test:issuer";

pub const TEST_AUDIENCE: &str = "urn:test:api";

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Certificate generation failed: {0}")]
    Certificate(#[from] rcgen::Error),

    #[error("Fixture I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// An Ed25519 signing identity: private key plus self-signed certificate.
#[derive(Debug, Clone)]
pub struct TestIdentity {
    /// Used as the certificate common name and as the `kid`.
    pub alias: String,
    pub pkcs8: Vec<u8>,
    pub cert_pem: String,
    pub cert_der: Vec<u8>,
}

impl TestIdentity {
    pub fn generate(alias: &str) -> Result<Self, FixtureError> {
        let key_pair = KeyPair::generate_for(&rcgen::PKCS_ED25519)?;

        let mut params = CertificateParams::new(vec![format!("{alias}.test")])?;
        params.distinguished_name.push(DnType::CommonName, alias);
        let cert = params.self_signed(&key_pair)?;

        Ok(Self {
            alias: alias.to_string(),
            pkcs8: key_pair.serialize_der(),
            cert_pem: cert.pem(),
            cert_der: cert.der().to_vec(),
        })
    }

    /// The identity's private key, with its alias as `kid`.
    pub fn signing_key(&self) -> SigningKey {
        SigningKey::from_pkcs8(self.alias.clone(), &self.pkcs8)
            .expect("Generated key should be Ed25519 PKCS#8")
    }

    pub fn certificate(&self) -> TrustedCertificate {
        TrustedCertificate::from_bytes(format!("{}.der", self.alias), &self.cert_der)
            .expect("Generated certificate should parse")
    }

    /// Write the certificate as `<alias>.pem` into `dir`.
    pub fn write_pem(&self, dir: &Path) -> Result<PathBuf, FixtureError> {
        let path = dir.join(format!("{}.pem", self.alias));
        std::fs::write(&path, &self.cert_pem)?;
        Ok(path)
    }

    /// Write the certificate as `<alias>.der` into `dir`.
    pub fn write_der(&self, dir: &Path) -> Result<PathBuf, FixtureError> {
        let path = dir.join(format!("{}.der", self.alias));
        std::fs::write(&path, &self.cert_der)?;
        Ok(path)
    }

    /// Seal this key under [`TEST_PASSPHRASE`] into `<alias>.keystore.json`.
    pub fn write_keystore(&self, dir: &Path) -> PathBuf {
        let path = dir.join(format!("{}.keystore.json", self.alias));
        let mut store = KeyStore::new();
        store
            .insert_with_iterations(
                &self.alias,
                &self.pkcs8,
                &SecretString::from(TEST_PASSPHRASE),
                TEST_KDF_ITERATIONS,
            )
            .expect("Fixture key should seal");
        store.save(&path).expect("Fixture keystore should save");
        path
    }

    /// Sign `claims` with an `EdDSA` header carrying this identity's `kid`.
    pub fn sign(&self, claims: &Value) -> String {
        let header = serde_json::json!({"alg": "EdDSA", "typ": "JWT", "kid": self.alias});
        self.sign_with_header(&header, claims)
    }

    /// Sign with an arbitrary header. The signature is always EdDSA, whatever
    /// `alg` the header declares.
    pub fn sign_with_header(&self, header: &Value, claims: &Value) -> String {
        let signing_input = format!("{}.{}", encode_segment(header), encode_segment(claims));
        let signature = jsonwebtoken::crypto::sign(
            signing_input.as_bytes(),
            &EncodingKey::from_ed_der(&self.pkcs8),
            Algorithm::EdDSA,
        )
        .expect("EdDSA signing should succeed");
        format!("{signing_input}.{signature}")
    }
}

/// Base64url-encode a JSON value as a token segment.
pub fn encode_segment(value: &Value) -> String {
    URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).expect("JSON value should serialize"))
}

/// Environment variables for `Config::from_vars` with test issuer and audience.
pub fn test_config_vars() -> HashMap<String, String> {
    HashMap::from([
        ("TOKEN_ISSUER".to_string(), TEST_ISSUER.to_string()),
        ("TOKEN_AUDIENCE".to_string(), TEST_AUDIENCE.to_string()),
    ])
}
