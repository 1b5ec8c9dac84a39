//! Signing key refresh while tokens are being issued and verified
//!
//! `TokenSigner::refresh` swaps the key atomically. Every token signed during
//! the swap must verify against exactly one of the two certificates, and its
//! `kid` must name the key that produced the signature.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use token_service::{
    Audience, CertificateStore, ClaimDefaults, Config, SignerError, TokenSigner, TokenVerifier,
};
use token_test_utils::{init_test_tracing, test_config_vars, TestIdentity, TEST_AUDIENCE, TEST_ISSUER};

fn defaults() -> ClaimDefaults {
    ClaimDefaults {
        issuer: TEST_ISSUER.to_string(),
        audience: Audience::Single(TEST_AUDIENCE.to_string()),
        expiration_minutes: 10,
        version: "1.0".to_string(),
    }
}

fn verifier_for(identity: &TestIdentity) -> TokenVerifier {
    let store = CertificateStore::from_certificates(vec![identity.certificate()]);
    TokenVerifier::new(Arc::new(store), Duration::from_secs(60))
}

fn kid(token: &str) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    let header = token.split('.').next().unwrap_or_default();
    let bytes = URL_SAFE_NO_PAD.decode(header).unwrap_or_default();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap_or_default();
    value["kid"].as_str().unwrap_or_default().to_string()
}

#[test]
fn test_tokens_issued_before_refresh_still_verify() -> Result<(), anyhow::Error> {
    init_test_tracing();
    let old = TestIdentity::generate("key-a")?;
    let new = TestIdentity::generate("key-b")?;
    let signer = TokenSigner::new(old.signing_key(), defaults());

    let before = signer.sign(&signer.default_claims())?;
    signer.refresh(new.signing_key());
    let after = signer.sign(&signer.default_claims())?;

    let store = CertificateStore::from_certificates(vec![old.certificate(), new.certificate()]);
    let verifier = TokenVerifier::new(Arc::new(store), Duration::from_secs(60));

    assert!(verifier.verify(&before).is_ok());
    assert!(verifier.verify(&after).is_ok());
    assert_eq!(kid(&before), "key-a");
    assert_eq!(kid(&after), "key-b");

    Ok(())
}

#[test]
fn test_concurrent_signing_during_refresh() -> Result<(), anyhow::Error> {
    init_test_tracing();
    let key_a = TestIdentity::generate("key-a")?;
    let key_b = TestIdentity::generate("key-b")?;
    let verify_a = verifier_for(&key_a);
    let verify_b = verifier_for(&key_b);

    let signer = TokenSigner::new(key_a.signing_key(), defaults());
    let done = AtomicBool::new(false);

    let tokens: Vec<String> = std::thread::scope(|s| {
        let rotator = s.spawn(|| {
            for round in 0..50 {
                let next = if round % 2 == 0 { &key_b } else { &key_a };
                signer.refresh(next.signing_key());
                std::thread::yield_now();
            }
            done.store(true, Ordering::SeqCst);
        });

        let workers: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(|| {
                    let mut issued = Vec::new();
                    while !done.load(Ordering::SeqCst) || issued.len() < 10 {
                        issued.push(signer.sign(&signer.default_claims())?);
                    }
                    Ok::<_, SignerError>(issued)
                })
            })
            .collect();

        let _ = rotator.join();
        workers
            .into_iter()
            .filter_map(|w| w.join().ok())
            .collect::<Result<Vec<_>, _>>()
            .map(|batches| batches.into_iter().flatten().collect())
    })?;

    assert!(tokens.len() >= 40);
    for token in &tokens {
        let by_a = verify_a.verify(token).is_ok();
        let by_b = verify_b.verify(token).is_ok();
        assert!(by_a ^ by_b, "token must verify under exactly one key");

        let expected_kid = if by_a { "key-a" } else { "key-b" };
        assert_eq!(kid(token), expected_kid, "kid must match the signing key");
    }

    Ok(())
}

#[test]
fn test_concurrent_verification_shares_store() -> Result<(), anyhow::Error> {
    init_test_tracing();
    let identity = TestIdentity::generate("primary")?;
    let verifier = verifier_for(&identity);
    let signer = TokenSigner::new(identity.signing_key(), defaults());
    let token = signer.sign(&signer.default_claims())?;

    std::thread::scope(|s| {
        for _ in 0..8 {
            let verifier = verifier.clone();
            let token = &token;
            s.spawn(move || {
                for _ in 0..25 {
                    assert!(verifier.verify(token).is_ok());
                }
            });
        }
    });

    Ok(())
}

#[test]
fn test_reload_failure_keeps_current_key() -> Result<(), anyhow::Error> {
    init_test_tracing();
    let dir = tempfile::tempdir()?;
    let current = TestIdentity::generate("current")?;
    let signer = TokenSigner::new(current.signing_key(), defaults());

    let mut vars = test_config_vars();
    vars.insert(
        "TOKEN_KEYSTORE_PATH".to_string(),
        dir.path().join("absent.json").display().to_string(),
    );
    vars.insert("TOKEN_KEYSTORE_PASSPHRASE".to_string(), "password".to_string());
    let config = Config::from_vars(&vars)?;

    assert!(signer.reload(&config).is_err());
    assert_eq!(signer.key_id(), "current");

    let token = signer.sign(&signer.default_claims())?;
    assert!(verifier_for(&current).verify(&token).is_ok());

    Ok(())
}

#[test]
fn test_reload_swaps_in_keystore_key() -> Result<(), anyhow::Error> {
    init_test_tracing();
    let dir = tempfile::tempdir()?;
    let current = TestIdentity::generate("current")?;
    let next = TestIdentity::generate("next")?;
    let keystore = next.write_keystore(dir.path());
    let signer = TokenSigner::new(current.signing_key(), defaults());

    let mut vars = test_config_vars();
    vars.insert(
        "TOKEN_KEYSTORE_PATH".to_string(),
        keystore.display().to_string(),
    );
    vars.insert(
        "TOKEN_KEYSTORE_PASSPHRASE".to_string(),
        token_test_utils::TEST_PASSPHRASE.to_string(),
    );
    vars.insert("TOKEN_KEY_ALIAS".to_string(), "next".to_string());
    let config = Config::from_vars(&vars)?;

    signer.reload(&config)?;
    assert_eq!(signer.key_id(), "next");

    let token = signer.sign(&signer.default_claims())?;
    assert!(verifier_for(&next).verify(&token).is_ok());

    Ok(())
}
