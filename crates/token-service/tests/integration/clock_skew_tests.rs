//! Integration tests for expiration, not-before and clock skew
//!
//! With a 60 second skew a token is accepted while `now < exp + 60` and
//! once `now >= nbf - 60`. `iat` plays no part in acceptance.

use std::sync::Arc;
use std::time::Duration;
use token_service::{CertificateStore, TokenVerifier, VerificationError};
use token_test_utils::{TestClaimsBuilder, TestIdentity};

fn verifier(identity: &TestIdentity, skew_secs: u64) -> TokenVerifier {
    let store = CertificateStore::from_certificates(vec![identity.certificate()]);
    TokenVerifier::new(Arc::new(store), Duration::from_secs(skew_secs))
}

#[test]
fn test_recently_expired_token_accepted_within_skew() -> Result<(), anyhow::Error> {
    let identity = TestIdentity::generate("primary")?;
    let token = identity.sign(&TestClaimsBuilder::new().expires_in(-30).build());

    assert!(verifier(&identity, 60).verify(&token).is_ok());

    Ok(())
}

#[test]
fn test_expired_beyond_skew_rejected() -> Result<(), anyhow::Error> {
    let identity = TestIdentity::generate("primary")?;
    let token = identity.sign(&TestClaimsBuilder::new().expires_in(-120).build());

    assert_eq!(
        verifier(&identity, 60).verify(&token),
        Err(VerificationError::Expired)
    );

    Ok(())
}

#[test]
fn test_zero_skew_rejects_any_expired_token() -> Result<(), anyhow::Error> {
    let identity = TestIdentity::generate("primary")?;
    let token = identity.sign(&TestClaimsBuilder::new().expires_in(-5).build());

    assert_eq!(
        verifier(&identity, 0).verify(&token),
        Err(VerificationError::Expired)
    );

    Ok(())
}

#[test]
fn test_not_before_within_skew_accepted() -> Result<(), anyhow::Error> {
    let identity = TestIdentity::generate("primary")?;
    let token = identity.sign(&TestClaimsBuilder::new().not_before_in(30).build());

    assert!(verifier(&identity, 60).verify(&token).is_ok());

    Ok(())
}

#[test]
fn test_not_before_beyond_skew_rejected() -> Result<(), anyhow::Error> {
    let identity = TestIdentity::generate("primary")?;
    let token = identity.sign(&TestClaimsBuilder::new().not_before_in(300).build());

    assert_eq!(
        verifier(&identity, 60).verify(&token),
        Err(VerificationError::NotYetValid)
    );

    Ok(())
}

#[test]
fn test_future_iat_accepted_when_window_is_valid() -> Result<(), anyhow::Error> {
    let identity = TestIdentity::generate("primary")?;
    let future = chrono::Utc::now().timestamp() + 300;
    let token = identity.sign(&TestClaimsBuilder::new().issued_at(future).build());

    let claims = verifier(&identity, 60).verify(&token)?;
    assert_eq!(claims.iat, Some(future));

    Ok(())
}

#[test]
fn test_missing_expiration_rejected() -> Result<(), anyhow::Error> {
    let identity = TestIdentity::generate("primary")?;
    let token = identity.sign(&TestClaimsBuilder::new().without_expiration().build());

    assert_eq!(
        verifier(&identity, 60).verify(&token),
        Err(VerificationError::MissingExpiration)
    );

    Ok(())
}

#[test]
fn test_audience_and_issuer_left_to_caller() -> Result<(), anyhow::Error> {
    let identity = TestIdentity::generate("primary")?;
    let token = identity.sign(
        &TestClaimsBuilder::new()
            .issued_by("urn:someone:else")
            .for_audience("urn:another:api")
            .build(),
    );

    let claims = verifier(&identity, 60).verify(&token)?;
    assert!(!claims.issued_by(token_test_utils::TEST_ISSUER));
    assert!(!claims.has_audience(token_test_utils::TEST_AUDIENCE));
    assert!(claims.has_audience("urn:another:api"));

    Ok(())
}
