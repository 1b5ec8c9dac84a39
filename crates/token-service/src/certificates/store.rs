use super::{CertificateLoadError, TrustedCertificate};
use crate::observability::metrics;
use std::path::Path;
use tracing::{error, info, instrument, warn};

/// Trusted certificates in trial order.
///
/// Built once at startup and never mutated; share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct CertificateStore {
    certificates: Vec<TrustedCertificate>,
    failures: Vec<CertificateLoadError>,
}

impl CertificateStore {
    /// Load every configured certificate file.
    ///
    /// A path that fails to load is recorded in [`CertificateStore::failures`]
    /// and skipped; the rest keep their configured order. An empty result is
    /// logged at error level, since the verifier will reject every token.
    #[instrument(skip_all, fields(configured = paths.len()))]
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut certificates = Vec::with_capacity(paths.len());
        let mut failures = Vec::new();

        for path in paths {
            let path = path.as_ref();
            match TrustedCertificate::from_file(path) {
                Ok(certificate) => {
                    info!(
                        target: "token.certificates",
                        path = %path.display(),
                        subject = %certificate.subject(),
                        serial = %certificate.serial(),
                        "Loaded trusted certificate"
                    );
                    certificates.push(certificate);
                }
                Err(error) => {
                    warn!(
                        target: "token.certificates",
                        path = %path.display(),
                        reason = error.reason(),
                        error = %error,
                        "Skipping trusted certificate"
                    );
                    metrics::record_certificate_load_failure(error.reason());
                    failures.push(error);
                }
            }
        }

        if certificates.is_empty() {
            error!(
                target: "token.certificates",
                failed = failures.len(),
                "No trusted certificates loaded; all tokens will be rejected"
            );
        }
        metrics::set_trusted_certificates(certificates.len());

        Self {
            certificates,
            failures,
        }
    }

    /// Build a store from already-parsed certificates, in trial order.
    pub fn from_certificates(certificates: Vec<TrustedCertificate>) -> Self {
        Self {
            certificates,
            failures: Vec::new(),
        }
    }

    pub fn certificates(&self) -> &[TrustedCertificate] {
        &self.certificates
    }

    /// Why each skipped path failed in [`CertificateStore::load`]. The path
    /// is available through [`CertificateLoadError::path`].
    pub fn failures(&self) -> &[CertificateLoadError] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrustedCertificate> {
        self.certificates.iter()
    }
}
