//! Certificate store loading from files, through configuration

use std::collections::HashMap;
use token_service::certificates::CertificateLoadError;
use token_service::{CertificateStore, Config, TokenVerifier};
use token_test_utils::{init_test_tracing, test_config_vars, TestClaimsBuilder, TestIdentity};

#[test]
fn test_load_mixed_good_and_bad_files() -> Result<(), anyhow::Error> {
    init_test_tracing();
    let dir = tempfile::tempdir()?;
    let primary = TestIdentity::generate("primary")?;
    let secondary = TestIdentity::generate("secondary")?;

    let primary_path = primary.write_pem(dir.path())?;
    let secondary_path = secondary.write_der(dir.path())?;
    let missing_path = dir.path().join("missing.pem");
    let garbage_path = dir.path().join("garbage.crt");
    std::fs::write(&garbage_path, b"\x30\x03\x02\x01")?;

    let store = CertificateStore::load(&[
        &missing_path,
        &primary_path,
        &garbage_path,
        &secondary_path,
    ]);

    assert_eq!(store.len(), 2);
    let subjects: Vec<_> = store.iter().map(|c| c.source().to_path_buf()).collect();
    assert_eq!(subjects, vec![primary_path, secondary_path]);

    let reasons: Vec<_> = store.failures().iter().map(|e| e.reason()).collect();
    assert_eq!(reasons, vec!["not_found", "malformed"]);
    let failed_paths: Vec<_> = store.failures().iter().map(|e| e.path().to_path_buf()).collect();
    assert_eq!(failed_paths, vec![missing_path, garbage_path]);
    assert!(matches!(
        store.failures().first(),
        Some(CertificateLoadError::NotFound { .. })
    ));

    Ok(())
}

#[test]
fn test_verifier_from_config_loads_certificates() -> Result<(), anyhow::Error> {
    init_test_tracing();
    let dir = tempfile::tempdir()?;
    let primary = TestIdentity::generate("primary")?;
    let secondary = TestIdentity::generate("secondary")?;
    let primary_path = primary.write_pem(dir.path())?;
    let secondary_path = secondary.write_pem(dir.path())?;

    let mut vars: HashMap<String, String> = test_config_vars();
    vars.insert(
        "TOKEN_TRUSTED_CERTIFICATES".to_string(),
        format!("{}, {}", primary_path.display(), secondary_path.display()),
    );
    vars.insert("TOKEN_CLOCK_SKEW_SECONDS".to_string(), "30".to_string());
    let config = Config::from_vars(&vars)?;

    let verifier = TokenVerifier::from_config(&config);
    assert_eq!(verifier.store().len(), 2);
    assert_eq!(verifier.clock_skew().as_secs(), 30);

    let token = secondary.sign(&TestClaimsBuilder::new().build());
    assert!(verifier.verify(&token).is_ok());

    Ok(())
}

#[test]
fn test_verifier_from_config_without_certificates_rejects() -> Result<(), anyhow::Error> {
    init_test_tracing();
    let identity = TestIdentity::generate("primary")?;
    let config = Config::from_vars(&test_config_vars())?;

    let verifier = TokenVerifier::from_config(&config);
    assert!(verifier.store().is_empty());

    let token = identity.sign(&TestClaimsBuilder::new().build());
    assert_eq!(
        verifier.verify(&token),
        Err(token_service::VerificationError::NoTrustAnchors)
    );

    Ok(())
}
