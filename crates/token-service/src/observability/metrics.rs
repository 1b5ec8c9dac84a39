//! Metric definitions for token issuance and verification
//!
//! All metrics follow Prometheus naming conventions:
//! - `jwt_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `status`: 2 values (success, error)
//! - `reason`: bounded by `VerificationError::reason` and `CertificateLoadError::reason`

use metrics::{counter, gauge, histogram};
use std::time::Duration;

// ============================================================================
// Verification Metrics
// ============================================================================

/// Record a verification outcome
///
/// Metric: `jwt_validations_total`
/// Labels: `status`, `reason`
pub fn record_token_validation(status: &str, reason: Option<&str>) {
    let reason = reason.unwrap_or("none");
    counter!("jwt_validations_total", "status" => status.to_string(), "reason" => reason.to_string())
        .increment(1);
}

/// Update the number of loaded trust anchors
///
/// Metric: `jwt_trusted_certificates`
pub fn set_trusted_certificates(count: usize) {
    gauge!("jwt_trusted_certificates").set(count as f64);
}

/// Record a certificate that could not be loaded
///
/// Metric: `jwt_certificate_load_failures_total`
/// Labels: `reason` (not_found, io, malformed)
pub fn record_certificate_load_failure(reason: &str) {
    counter!("jwt_certificate_load_failures_total", "reason" => reason.to_string()).increment(1);
}

// ============================================================================
// Issuance Metrics
// ============================================================================

/// Record token issuance duration and outcome
///
/// Metric: `jwt_issuance_duration_seconds`, `jwt_issuance_total`
/// Labels: `status`
pub fn record_token_issuance(status: &str, duration: Duration) {
    histogram!("jwt_issuance_duration_seconds", "status" => status.to_string())
        .record(duration.as_secs_f64());

    counter!("jwt_issuance_total", "status" => status.to_string()).increment(1);
}

/// Record a signing key refresh
///
/// Metric: `jwt_signing_key_refresh_total`
/// Labels: `status`
pub fn record_signing_key_refresh(status: &str) {
    counter!("jwt_signing_key_refresh_total", "status" => status.to_string()).increment(1);
}
