//! Trial-order tests for verification against several trust anchors

use std::sync::Arc;
use std::time::Duration;
use token_service::{CertificateStore, TokenVerifier, VerificationError};
use token_test_utils::{encode_segment, TestClaimsBuilder, TestIdentity};

fn verifier(identities: &[&TestIdentity]) -> TokenVerifier {
    let store =
        CertificateStore::from_certificates(identities.iter().map(|i| i.certificate()).collect());
    TokenVerifier::new(Arc::new(store), Duration::from_secs(60))
}

/// The signing certificate is found whatever its position in the store.
#[test]
fn test_matching_certificate_at_any_position() -> Result<(), anyhow::Error> {
    let a = TestIdentity::generate("a")?;
    let b = TestIdentity::generate("b")?;
    let c = TestIdentity::generate("c")?;

    for signer in [&a, &b, &c] {
        let token = signer.sign(&TestClaimsBuilder::new().build());
        let result = verifier(&[&a, &b, &c]).verify(&token);
        assert!(
            result.is_ok(),
            "token from {} should verify, got {result:?}",
            signer.alias
        );
    }

    Ok(())
}

#[test]
fn test_no_matching_certificate() -> Result<(), anyhow::Error> {
    let signer = TestIdentity::generate("signer")?;
    let a = TestIdentity::generate("a")?;
    let b = TestIdentity::generate("b")?;

    let token = signer.sign(&TestClaimsBuilder::new().build());

    assert_eq!(
        verifier(&[&a, &b]).verify(&token),
        Err(VerificationError::NoMatchingTrustAnchor)
    );

    Ok(())
}

#[test]
fn test_empty_store_rejects_every_token() -> Result<(), anyhow::Error> {
    let signer = TestIdentity::generate("signer")?;
    let token = signer.sign(&TestClaimsBuilder::new().build());

    let verifier = TokenVerifier::new(
        Arc::new(CertificateStore::from_certificates(Vec::new())),
        Duration::from_secs(60),
    );

    assert_eq!(verifier.verify(&token), Err(VerificationError::NoTrustAnchors));
    assert_eq!(verifier.verify("garbage"), Err(VerificationError::NoTrustAnchors));

    Ok(())
}

#[test]
fn test_kid_header_is_not_used_for_selection() -> Result<(), anyhow::Error> {
    let a = TestIdentity::generate("a")?;
    let b = TestIdentity::generate("b")?;

    // Signed by b but claims to be a
    let header = serde_json::json!({"alg": "EdDSA", "typ": "JWT", "kid": "a"});
    let token = b.sign_with_header(&header, &TestClaimsBuilder::new().build());

    assert!(verifier(&[&a, &b]).verify(&token).is_ok());
    assert_eq!(
        verifier(&[&a]).verify(&token),
        Err(VerificationError::NoMatchingTrustAnchor)
    );

    Ok(())
}

#[test]
fn test_tampered_payload_is_rejected() -> Result<(), anyhow::Error> {
    let identity = TestIdentity::generate("primary")?;
    let other = TestIdentity::generate("other")?;
    let third = TestIdentity::generate("third")?;
    let token = identity.sign(&TestClaimsBuilder::new().for_subject("reader").build());

    let mut parts = token.split('.');
    let header = parts.next().unwrap_or_default();
    let signature = parts.nth(1).unwrap_or_default();
    let forged = encode_segment(&TestClaimsBuilder::new().for_subject("admin").build());
    let tampered = format!("{header}.{forged}.{signature}");

    assert_eq!(
        verifier(&[&other, &identity, &third]).verify(&tampered),
        Err(VerificationError::NoMatchingTrustAnchor)
    );

    Ok(())
}

#[test]
fn test_tampered_signature_is_rejected() -> Result<(), anyhow::Error> {
    let identity = TestIdentity::generate("primary")?;
    let other = TestIdentity::generate("other")?;
    let claims = TestClaimsBuilder::new().build();

    let token = identity.sign(&claims);
    let foreign = other.sign(&claims);
    let (signing_input, _) = token.rsplit_once('.').unwrap_or_default();
    let (_, foreign_signature) = foreign.rsplit_once('.').unwrap_or_default();
    let spliced = format!("{signing_input}.{foreign_signature}");

    assert_eq!(
        verifier(&[&identity]).verify(&spliced),
        Err(VerificationError::NoMatchingTrustAnchor)
    );

    Ok(())
}
