//! Algorithm pinning tests
//!
//! Only `EdDSA` is accepted. Tokens declaring any other algorithm are
//! rejected before a signature is checked, even when the bytes were signed by
//! a trusted key.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use token_service::{CertificateStore, TokenVerifier, VerificationError};
use token_test_utils::{encode_segment, TestClaimsBuilder, TestIdentity};

fn verifier(identity: &TestIdentity) -> TokenVerifier {
    let store = CertificateStore::from_certificates(vec![identity.certificate()]);
    TokenVerifier::new(Arc::new(store), Duration::from_secs(60))
}

#[test]
fn test_other_algorithms_rejected_even_with_valid_signature() -> Result<(), anyhow::Error> {
    let identity = TestIdentity::generate("primary")?;
    let verifier = verifier(&identity);
    let claims = TestClaimsBuilder::new().build();

    for alg in ["none", "HS256", "RS256", "ES256", "PS256"] {
        let token = identity.sign_with_header(&json!({"alg": alg, "typ": "JWT"}), &claims);
        assert_eq!(
            verifier.verify(&token),
            Err(VerificationError::UnsupportedAlgorithm),
            "alg {alg} must be rejected"
        );
    }

    Ok(())
}

#[test]
fn test_unsigned_token_rejected() -> Result<(), anyhow::Error> {
    let identity = TestIdentity::generate("primary")?;
    let header = encode_segment(&json!({"alg": "none", "typ": "JWT"}));
    let payload = encode_segment(&TestClaimsBuilder::new().build());

    assert_eq!(
        verifier(&identity).verify(&format!("{header}.{payload}.")),
        Err(VerificationError::UnsupportedAlgorithm)
    );

    Ok(())
}

#[test]
fn test_hmac_token_keyed_with_certificate_rejected() -> Result<(), anyhow::Error> {
    // Classic confusion attack: HS256 keyed with the public certificate bytes
    let identity = TestIdentity::generate("primary")?;
    let claims = TestClaimsBuilder::new().build();
    let key = jsonwebtoken::EncodingKey::from_secret(&identity.cert_der);
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
        &claims,
        &key,
    )?;

    assert_eq!(
        verifier(&identity).verify(&token),
        Err(VerificationError::UnsupportedAlgorithm)
    );

    Ok(())
}

#[test]
fn test_malformed_tokens_rejected() -> Result<(), anyhow::Error> {
    let identity = TestIdentity::generate("primary")?;
    let verifier = verifier(&identity);

    for token in ["", "a", "a.b", "a.b.c.d", "....", "e30.e30.!!"] {
        assert_eq!(
            verifier.verify(token),
            Err(VerificationError::Malformed),
            "token {token:?} must be malformed"
        );
    }

    Ok(())
}

#[test]
fn test_oversized_token_rejected() -> Result<(), anyhow::Error> {
    let identity = TestIdentity::generate("primary")?;
    let padding = "x".repeat(common::jwt::MAX_JWT_SIZE_BYTES);
    let token = identity.sign(&TestClaimsBuilder::new().with_claim("padding", padding).build());

    assert_eq!(
        verifier(&identity).verify(&token),
        Err(VerificationError::TokenTooLarge)
    );

    Ok(())
}
