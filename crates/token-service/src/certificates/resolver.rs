use super::TrustedCertificate;
use jsonwebtoken::DecodingKey;
use thiserror::Error;

/// Dotted OID of Ed25519 subject public keys (RFC 8410).
pub const ED25519_OID: &str = "1.3.101.112";

const ED25519_PUBLIC_KEY_LEN: usize = 32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyResolutionError {
    #[error("Unsupported key algorithm: {0}")]
    UnsupportedKeyAlgorithm(String),

    #[error("Invalid Ed25519 public key length: {0}")]
    InvalidKeyLength(usize),
}

/// Derive the verification key from a certificate's subject public key.
///
/// Only the certificate is consulted, never a `kid` or thumbprint carried by
/// the token.
pub fn resolve_key(certificate: &TrustedCertificate) -> Result<DecodingKey, KeyResolutionError> {
    if certificate.key_algorithm() != ED25519_OID {
        return Err(KeyResolutionError::UnsupportedKeyAlgorithm(
            certificate.key_algorithm().to_string(),
        ));
    }

    let public_key = certificate.public_key();
    if public_key.len() != ED25519_PUBLIC_KEY_LEN {
        return Err(KeyResolutionError::InvalidKeyLength(public_key.len()));
    }

    Ok(DecodingKey::from_ed_der(public_key))
}
