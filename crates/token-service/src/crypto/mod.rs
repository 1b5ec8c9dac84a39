use crate::errors::CryptoError;
use common::secret::{ExposeSecret, SecretBox, SecretString};
use ring::{
    aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM},
    pbkdf2,
    rand::{SecureRandom, SystemRandom},
    signature::{Ed25519KeyPair, KeyPair},
};
use std::fmt;
use std::num::NonZeroU32;
use tracing::instrument;

/// Length of the AES-256-GCM wrapping key derived from a passphrase.
pub const WRAPPING_KEY_LEN: usize = 32;

/// Encrypted key structure (AES-256-GCM)
///
/// The `encrypted_data` field is wrapped in `SecretBox` to prevent accidental
/// exposure. While it is ciphertext, it still contains sensitive encrypted
/// key material that should not be logged.
pub struct EncryptedKey {
    /// Encrypted key material (AES-256-GCM ciphertext).
    pub encrypted_data: SecretBox<Vec<u8>>,
    pub nonce: Vec<u8>, // 96-bit (12 bytes)
    pub tag: Vec<u8>,   // 128-bit (16 bytes)
}

impl Clone for EncryptedKey {
    fn clone(&self) -> Self {
        Self {
            encrypted_data: SecretBox::new(Box::new(self.encrypted_data.expose_secret().clone())),
            nonce: self.nonce.clone(),
            tag: self.tag.clone(),
        }
    }
}

impl fmt::Debug for EncryptedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedKey")
            .field("encrypted_data", &"[REDACTED]")
            .field("nonce", &"[REDACTED]")
            .field("tag", &"[REDACTED]")
            .finish()
    }
}

/// Generate an Ed25519 keypair using CSPRNG
///
/// Returns the private key as a PKCS#8 v2 document.
#[instrument(skip_all)]
pub fn generate_signing_key() -> Result<SecretBox<Vec<u8>>, CryptoError> {
    let rng = SystemRandom::new();

    let pkcs8_bytes = Ed25519KeyPair::generate_pkcs8(&rng)
        .map_err(|e| CryptoError(format!("Keypair generation failed: {}", e)))?;

    Ok(SecretBox::new(Box::new(pkcs8_bytes.as_ref().to_vec())))
}

/// Check that `private_key_pkcs8` is an Ed25519 PKCS#8 document and return
/// its raw 32-byte public key.
#[instrument(skip_all)]
pub fn ed25519_public_key(private_key_pkcs8: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let key_pair = Ed25519KeyPair::from_pkcs8_maybe_unchecked(private_key_pkcs8)
        .map_err(|e| CryptoError(format!("Invalid private key format: {}", e)))?;

    Ok(key_pair.public_key().as_ref().to_vec())
}

/// Derive the AES-256-GCM wrapping key for a keystore entry.
///
/// PBKDF2-HMAC-SHA256 over the passphrase with a per-entry salt.
#[instrument(skip_all)]
pub fn derive_wrapping_key(
    passphrase: &SecretString,
    salt: &[u8],
    iterations: NonZeroU32,
) -> SecretBox<[u8; WRAPPING_KEY_LEN]> {
    // Derived straight into the heap allocation the SecretBox takes over
    let mut key = Box::new([0u8; WRAPPING_KEY_LEN]);
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        salt,
        passphrase.expose_secret().as_bytes(),
        key.as_mut_slice(),
    );
    SecretBox::new(key)
}

/// Encrypt private key with AES-256-GCM
///
/// Uses a 96-bit random nonce and produces a 128-bit authentication tag
#[instrument(skip_all)]
pub fn encrypt_private_key(
    private_key: &[u8],
    wrapping_key: &[u8],
) -> Result<EncryptedKey, CryptoError> {
    if wrapping_key.len() != WRAPPING_KEY_LEN {
        return Err(CryptoError(format!(
            "Invalid wrapping key length: {} (expected {})",
            wrapping_key.len(),
            WRAPPING_KEY_LEN
        )));
    }

    let rng = SystemRandom::new();

    // Generate random 96-bit nonce (12 bytes)
    let mut nonce_bytes = [0u8; 12];
    rng.fill(&mut nonce_bytes)
        .map_err(|e| CryptoError(format!("Nonce generation failed: {}", e)))?;

    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let unbound_key = UnboundKey::new(&AES_256_GCM, wrapping_key)
        .map_err(|e| CryptoError(format!("Cipher key creation failed: {}", e)))?;
    let sealing_key = LessSafeKey::new(unbound_key);

    let mut in_out = private_key.to_vec();
    sealing_key
        .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
        .map_err(|e| CryptoError(format!("Encryption operation failed: {}", e)))?;

    // After seal_in_place_append_tag, the buffer contains ciphertext + 16-byte tag
    let tag_start = in_out
        .len()
        .checked_sub(16)
        .ok_or_else(|| CryptoError("Encryption produced invalid output".to_string()))?;
    let encrypted_data = in_out
        .get(..tag_start)
        .ok_or_else(|| CryptoError("Encryption produced invalid output".to_string()))?
        .to_vec();
    let tag = in_out
        .get(tag_start..)
        .ok_or_else(|| CryptoError("Encryption produced invalid output".to_string()))?
        .to_vec();

    Ok(EncryptedKey {
        encrypted_data: SecretBox::new(Box::new(encrypted_data)),
        nonce: nonce_bytes.to_vec(),
        tag,
    })
}

/// Decrypt private key with AES-256-GCM
#[instrument(skip_all)]
pub fn decrypt_private_key(
    encrypted: &EncryptedKey,
    wrapping_key: &[u8],
) -> Result<SecretBox<Vec<u8>>, CryptoError> {
    if wrapping_key.len() != WRAPPING_KEY_LEN {
        return Err(CryptoError(format!(
            "Invalid wrapping key length: {} (expected {})",
            wrapping_key.len(),
            WRAPPING_KEY_LEN
        )));
    }

    if encrypted.nonce.len() != 12 {
        return Err(CryptoError(format!(
            "Invalid nonce length: {} (expected 12)",
            encrypted.nonce.len()
        )));
    }

    if encrypted.tag.len() != 16 {
        return Err(CryptoError(format!(
            "Invalid tag length: {} (expected 16)",
            encrypted.tag.len()
        )));
    }

    // Reconstruct ciphertext with tag
    let mut in_out = encrypted.encrypted_data.expose_secret().clone();
    in_out.extend_from_slice(&encrypted.tag);

    let nonce_bytes: [u8; 12] = encrypted
        .nonce
        .as_slice()
        .try_into()
        .map_err(|e| CryptoError(format!("Invalid nonce format: {}", e)))?;
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let unbound_key = UnboundKey::new(&AES_256_GCM, wrapping_key)
        .map_err(|e| CryptoError(format!("Cipher key creation failed: {}", e)))?;
    let opening_key = LessSafeKey::new(unbound_key);

    let decrypted = opening_key
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|e| CryptoError(format!("Decryption operation failed: {}", e)))?;

    Ok(SecretBox::new(Box::new(decrypted.to_vec())))
}

/// Generate cryptographically secure random bytes
pub fn generate_random_bytes(len: usize) -> Result<Vec<u8>, CryptoError> {
    let rng = SystemRandom::new();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes)
        .map_err(|e| CryptoError(format!("Random bytes generation failed: {}", e)))?;
    Ok(bytes)
}
