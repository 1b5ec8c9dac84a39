//! Token verification against the configured trust anchors.
//!
//! # Verification order
//!
//! 1. Size limit, before any parsing. Tokens over `MAX_JWT_SIZE_BYTES` fail
//!    with [`VerificationError::TokenTooLarge`], a rejection added on top of
//!    the structural and claim failures so oversized input is never decoded
//! 2. At least one trusted certificate
//! 3. Structure, parsed once (three base64url segments, JSON header and claims)
//! 4. `alg` pinned to `EdDSA`
//! 5. Signature, tried against each certificate in store order; the first
//!    certificate that verifies decides the outcome
//! 6. `exp` and `nbf` against the current time with clock skew. `iat` is
//!    informational and not checked
//!
//! Audience and issuer are not checked here. Callers apply their own policy
//! to the returned claims with [`Claims::has_audience`] and
//! [`Claims::issued_by`].

use crate::certificates::{resolve_key, CertificateStore};
use crate::claims::Claims;
use crate::config::Config;
use crate::errors::VerificationError;
use crate::observability::{hash_for_correlation, metrics};
use chrono::Utc;
use common::jwt::{split_compact, MAX_CLOCK_SKEW, MAX_JWT_SIZE_BYTES};
use jsonwebtoken::Algorithm;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// The only accepted `alg` header value.
const EDDSA_ALG: &str = "EdDSA";

/// Either the verified claims or the reason the token was rejected.
pub type VerificationOutcome = Result<Claims, VerificationError>;

#[derive(Debug, Clone)]
pub struct TokenVerifier {
    store: Arc<CertificateStore>,
    clock_skew: Duration,
}

impl TokenVerifier {
    /// Create a verifier over `store`.
    ///
    /// `clock_skew` is capped at `MAX_CLOCK_SKEW`.
    pub fn new(store: Arc<CertificateStore>, clock_skew: Duration) -> Self {
        if clock_skew > MAX_CLOCK_SKEW {
            warn!(
                target: "token.verifier",
                requested_secs = clock_skew.as_secs(),
                max_secs = MAX_CLOCK_SKEW.as_secs(),
                "Clock skew capped at maximum"
            );
        }

        Self {
            store,
            clock_skew: clock_skew.min(MAX_CLOCK_SKEW),
        }
    }

    /// Load the configured trusted certificates and build a verifier.
    pub fn from_config(config: &Config) -> Self {
        let store = CertificateStore::load(&config.trusted_certificates);
        Self::new(Arc::new(store), config.clock_skew)
    }

    pub fn store(&self) -> &Arc<CertificateStore> {
        &self.store
    }

    pub fn clock_skew(&self) -> Duration {
        self.clock_skew
    }

    /// Verify a compact token against the trust anchors at the current time.
    #[instrument(skip_all)]
    pub fn verify(&self, token: &str) -> VerificationOutcome {
        let outcome = self.verify_at(token, Utc::now().timestamp());

        match &outcome {
            Ok(claims) => {
                metrics::record_token_validation("success", None);
                debug!(
                    target: "token.verifier",
                    jti = %claims.jti.as_deref().map(hash_for_correlation).unwrap_or_default(),
                    "Token verified"
                );
            }
            Err(e) => {
                metrics::record_token_validation("error", Some(e.reason()));
                debug!(target: "token.verifier", reason = e.reason(), "Token rejected");
            }
        }

        outcome
    }

    /// Verify against an explicit `now` (Unix epoch seconds).
    pub(crate) fn verify_at(&self, token: &str, now: i64) -> VerificationOutcome {
        if token.len() > MAX_JWT_SIZE_BYTES {
            return Err(VerificationError::TokenTooLarge);
        }

        if self.store.is_empty() {
            return Err(VerificationError::NoTrustAnchors);
        }

        let parsed = split_compact(token)?;
        let claims: Claims = parsed.payload_as()?;

        if parsed.algorithm() != Some(EDDSA_ALG) {
            debug!(
                target: "token.verifier",
                alg = ?parsed.algorithm(),
                "Token rejected: unsupported algorithm"
            );
            return Err(VerificationError::UnsupportedAlgorithm);
        }

        for (position, certificate) in self.store.iter().enumerate() {
            let key = match resolve_key(certificate) {
                Ok(key) => key,
                Err(e) => {
                    debug!(
                        target: "token.verifier",
                        position,
                        subject = %certificate.subject(),
                        error = %e,
                        "Skipping certificate with unusable key"
                    );
                    continue;
                }
            };

            let verified = jsonwebtoken::crypto::verify(
                parsed.signature(),
                parsed.signing_input().as_bytes(),
                &key,
                Algorithm::EdDSA,
            )
            .unwrap_or(false);

            if verified {
                debug!(
                    target: "token.verifier",
                    position,
                    subject = %certificate.subject(),
                    "Signature verified"
                );
                return self.validate_claims_at(claims, now);
            }
        }

        Err(VerificationError::NoMatchingTrustAnchor)
    }

    /// Time-based claim checks, applied once a signature has verified.
    pub(crate) fn validate_claims_at(&self, claims: Claims, now: i64) -> VerificationOutcome {
        // Safe cast: clock_skew is capped at MAX_CLOCK_SKEW (600 seconds)
        #[allow(clippy::cast_possible_wrap)]
        let skew = self.clock_skew.as_secs() as i64;

        let exp = claims.exp.ok_or(VerificationError::MissingExpiration)?;
        // Exclusive bound: valid only while now < exp + skew
        if now.saturating_sub(skew) >= exp {
            return Err(VerificationError::Expired);
        }

        if let Some(nbf) = claims.nbf {
            if nbf > now.saturating_add(skew) {
                return Err(VerificationError::NotYetValid);
            }
        }

        Ok(claims)
    }
}
