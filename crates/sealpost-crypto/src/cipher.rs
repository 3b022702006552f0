//! AES-256-GCM cipher operations.
//!
//! The tag is kept detached from the ciphertext so the envelope formats can
//! carry `iv`, `ciphertext` and `authTag` as separate fields.

use aes_gcm::{
    aead::{AeadInPlace, KeyInit},
    Aes256Gcm, Nonce, Tag,
};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{CryptoError, CryptoResult};
use crate::kdf::SALT_LEN;

/// AES-GCM nonce length in bytes.
pub const IV_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// AES-256 key length in bytes.
pub const SYMMETRIC_KEY_LEN: usize = 32;

/// Generate cryptographically secure random bytes.
pub fn generate_random<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Generate a random KDF salt (16 bytes).
pub fn generate_salt() -> [u8; SALT_LEN] {
    generate_random()
}

/// Generate a random IV (12 bytes).
pub fn generate_iv() -> [u8; IV_LEN] {
    generate_random()
}

/// Ephemeral AES-256 key, zeroized on drop.
///
/// Used as the per-file data key; never serialized.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; SYMMETRIC_KEY_LEN]);

impl SymmetricKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        Self(generate_random())
    }

    /// Create a key from raw bytes.
    pub fn from_bytes(bytes: [u8; SYMMETRIC_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the key bytes.
    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Output of [`encrypt`]: IV, ciphertext and detached tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encrypted {
    pub iv: [u8; IV_LEN],
    pub ciphertext: Vec<u8>,
    pub auth_tag: [u8; TAG_LEN],
}

/// Encrypt plaintext with AES-256-GCM under a freshly generated IV.
pub fn encrypt(key: &[u8; SYMMETRIC_KEY_LEN], plaintext: &[u8]) -> CryptoResult<Encrypted> {
    let iv = generate_iv();
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut buffer = plaintext.to_vec();
    let tag = match cipher.encrypt_in_place_detached(Nonce::from_slice(&iv), b"", &mut buffer) {
        Ok(tag) => tag,
        Err(_) => {
            // buffer still holds plaintext
            buffer.zeroize();
            return Err(CryptoError::Encryption("AES-GCM encryption failed".into()));
        }
    };

    let mut auth_tag = [0u8; TAG_LEN];
    auth_tag.copy_from_slice(tag.as_slice());

    Ok(Encrypted {
        iv,
        ciphertext: buffer,
        auth_tag,
    })
}

/// Decrypt AES-256-GCM ciphertext with a detached tag.
///
/// The tag is checked before any keystream is applied, so no unauthenticated
/// plaintext is ever produced. Every failure is the same
/// [`CryptoError::AuthenticationFailure`].
pub fn decrypt(
    key: &[u8; SYMMETRIC_KEY_LEN],
    iv: &[u8; IV_LEN],
    ciphertext: &[u8],
    auth_tag: &[u8; TAG_LEN],
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::AuthenticationFailure)?;

    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(iv),
            b"",
            buffer.as_mut_slice(),
            Tag::from_slice(auth_tag),
        )
        .map_err(|_| CryptoError::AuthenticationFailure)?;

    Ok(buffer)
}
