//! Service identity token library
//!
//! Issues and verifies EdDSA-signed JWTs used for service-to-service
//! authentication. Verification trusts one or more X.509 certificates loaded
//! at startup; issuance signs with a private key held in a
//! passphrase-protected keystore.
//!
//! # Modules
//!
//! - `certificates` - Trust anchor loading and public key resolution
//! - `claims` - Token payload model
//! - `config` - Configuration from environment variables
//! - `crypto` - Key sealing primitives (PBKDF2, AES-256-GCM, Ed25519)
//! - `errors` - Verification and signing error types
//! - `keystore` - Passphrase-protected signing key container
//! - `observability` - Metrics and log correlation helpers
//! - `signer` - Token issuance
//! - `verifier` - Token verification against the trust anchors

pub mod certificates;
pub mod claims;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod keystore;
pub mod observability;
pub mod signer;
pub mod verifier;

pub use certificates::{CertificateLoadError, CertificateStore, TrustedCertificate};
pub use claims::{Audience, Claims};
pub use config::Config;
pub use errors::{SignerError, VerificationError};
pub use keystore::KeyStore;
pub use signer::{ClaimDefaults, SigningKey, TokenSigner};
pub use verifier::{TokenVerifier, VerificationOutcome};
