//! Trust anchors for token verification.
//!
//! A [`TrustedCertificate`] is an X.509 certificate read from one file. The
//! [`CertificateStore`] holds the certificates configured for this process in
//! trial order, and [`resolve_key`] turns a certificate into the key the
//! verifier checks signatures with.

mod resolver;
mod store;

pub use resolver::{resolve_key, KeyResolutionError, ED25519_OID};
pub use store::CertificateStore;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use x509_parser::pem::parse_x509_pem;
use x509_parser::parse_x509_certificate;

const PEM_PREFIX: &str = "-----BEGIN";

#[derive(Debug, Error)]
pub enum CertificateLoadError {
    #[error("Certificate file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read certificate file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed certificate {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },
}

impl CertificateLoadError {
    pub fn path(&self) -> &Path {
        match self {
            CertificateLoadError::NotFound { path }
            | CertificateLoadError::Io { path, .. }
            | CertificateLoadError::Malformed { path, .. } => path,
        }
    }

    /// Bounded label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            CertificateLoadError::NotFound { .. } => "not_found",
            CertificateLoadError::Io { .. } => "io",
            CertificateLoadError::Malformed { .. } => "malformed",
        }
    }
}

/// A parsed X.509 certificate trusted to sign tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct TrustedCertificate {
    source: PathBuf,
    subject: String,
    serial: String,
    not_before: i64,
    not_after: i64,
    key_algorithm: String,
    public_key: Vec<u8>,
    der: Vec<u8>,
}

impl TrustedCertificate {
    /// Read and parse a certificate file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CertificateLoadError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                CertificateLoadError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                CertificateLoadError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        Self::from_bytes(path, &bytes)
    }

    /// Parse a PEM or DER certificate; `source` labels it in diagnostics.
    ///
    /// Only the first certificate of a PEM bundle is used.
    pub fn from_bytes(source: impl AsRef<Path>, bytes: &[u8]) -> Result<Self, CertificateLoadError> {
        let source = source.as_ref();
        let malformed = |reason: String| CertificateLoadError::Malformed {
            path: source.to_path_buf(),
            reason,
        };

        let der = if is_pem(bytes) {
            let (_, pem) = parse_x509_pem(bytes).map_err(|e| malformed(format!("invalid PEM: {e}")))?;
            if pem.label != "CERTIFICATE" {
                return Err(malformed(format!("unexpected PEM label {}", pem.label)));
            }
            pem.contents
        } else {
            bytes.to_vec()
        };

        let (_, cert) =
            parse_x509_certificate(&der).map_err(|e| malformed(format!("invalid X.509: {e}")))?;

        let spki = cert.public_key();
        let subject = cert.subject().to_string();
        let serial = cert.raw_serial_as_string();
        let not_before = cert.validity().not_before.timestamp();
        let not_after = cert.validity().not_after.timestamp();
        let key_algorithm = spki.algorithm.algorithm.to_id_string();
        let public_key = spki.subject_public_key.data.to_vec();
        // Release the borrow of `der` before moving it
        drop(cert);

        Ok(Self {
            source: source.to_path_buf(),
            subject,
            serial,
            not_before,
            not_after,
            key_algorithm,
            public_key,
            der,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Serial number as colon-separated hex.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Validity window as Unix epoch seconds (`notBefore`, `notAfter`).
    pub fn validity(&self) -> (i64, i64) {
        (self.not_before, self.not_after)
    }

    /// Dotted OID of the subject public key algorithm.
    pub fn key_algorithm(&self) -> &str {
        &self.key_algorithm
    }

    /// Raw subject public key bits.
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }
}

impl fmt::Debug for TrustedCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustedCertificate")
            .field("source", &self.source)
            .field("subject", &self.subject)
            .field("serial", &self.serial)
            .field("not_before", &self.not_before)
            .field("not_after", &self.not_after)
            .field("key_algorithm", &self.key_algorithm)
            .finish_non_exhaustive()
    }
}

fn is_pem(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes
        .get(start..)
        .is_some_and(|rest| rest.starts_with(PEM_PREFIX.as_bytes()))
}
