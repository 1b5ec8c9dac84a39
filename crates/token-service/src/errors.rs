use common::jwt::JwtValidationError;
use thiserror::Error;

/// Why a token was rejected.
///
/// Every variant renders the same generic message so that nothing about the
/// failure leaks to the caller; callers must treat all of them as "reject the
/// request". Use [`VerificationError::reason`] for logs and metrics.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VerificationError {
    /// Token exceeds `MAX_JWT_SIZE_BYTES`.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token is not a well-formed compact JWT.
    #[error("The access token is invalid or expired")]
    Malformed,

    /// Header declares an algorithm other than EdDSA (including `none`).
    #[error("The access token is invalid or expired")]
    UnsupportedAlgorithm,

    /// The certificate store is empty.
    #[error("The access token is invalid or expired")]
    NoTrustAnchors,

    /// No trusted certificate verified the signature.
    #[error("The access token is invalid or expired")]
    NoMatchingTrustAnchor,

    /// Signature verified but the token carries no `exp` claim.
    #[error("The access token is invalid or expired")]
    MissingExpiration,

    /// `exp` is in the past beyond the clock skew tolerance.
    #[error("The access token is invalid or expired")]
    Expired,

    /// `nbf` is in the future beyond the clock skew tolerance.
    #[error("The access token is invalid or expired")]
    NotYetValid,
}

impl VerificationError {
    /// Bounded label for metrics and structured logs.
    pub fn reason(&self) -> &'static str {
        match self {
            VerificationError::TokenTooLarge => "token_too_large",
            VerificationError::Malformed => "malformed",
            VerificationError::UnsupportedAlgorithm => "unsupported_algorithm",
            VerificationError::NoTrustAnchors => "no_trust_anchors",
            VerificationError::NoMatchingTrustAnchor => "no_matching_trust_anchor",
            VerificationError::MissingExpiration => "missing_expiration",
            VerificationError::Expired => "expired",
            VerificationError::NotYetValid => "not_yet_valid",
        }
    }
}

impl From<JwtValidationError> for VerificationError {
    fn from(err: JwtValidationError) -> Self {
        match err {
            JwtValidationError::TokenTooLarge => VerificationError::TokenTooLarge,
            JwtValidationError::MalformedToken => VerificationError::Malformed,
        }
    }
}

#[derive(Debug, Error)]
pub enum SignerError {
    /// The signing key could not be loaded or is not an Ed25519 key.
    #[error("Signing key unavailable: {0}")]
    KeyUnavailable(String),

    /// Claim overrides do not fit the claims schema.
    #[error("Invalid claims: {0}")]
    InvalidClaims(String),

    #[error("JWT signing operation failed: {0}")]
    Signing(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Cryptographic error: {0}")]
pub struct CryptoError(pub String);
