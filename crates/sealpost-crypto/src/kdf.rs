//! Password-based key derivation using PBKDF2-HMAC-SHA512.

use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

/// Derived key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// Lowest iteration count accepted for derivation.
pub const MIN_ITERATIONS: u32 = 100_000;

/// Default iteration count.
pub const DEFAULT_ITERATIONS: u32 = 210_000;

/// Highest iteration count accepted; bounds the work an untrusted envelope
/// can make us do.
pub const MAX_ITERATIONS: u32 = 10_000_000;

/// Largest output a single derivation may produce (one SHA-512 block).
pub const MAX_OUTPUT_LEN: usize = 64;

/// PBKDF2 parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct KdfParams {
    /// PBKDF2 iteration count (default: 210 000).
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl KdfParams {
    /// Create parameters with an explicit iteration count.
    pub fn with_iterations(iterations: u32) -> CryptoResult<Self> {
        let params = Self { iterations };
        params.validate()?;
        Ok(params)
    }

    /// Check the iteration count is within the accepted range.
    pub fn validate(&self) -> CryptoResult<()> {
        if self.iterations < MIN_ITERATIONS {
            return Err(CryptoError::InvalidKdfParams(format!(
                "iterations must be at least {}, got {}",
                MIN_ITERATIONS, self.iterations
            )));
        }
        if self.iterations > MAX_ITERATIONS {
            return Err(CryptoError::InvalidKdfParams(format!(
                "iterations must be at most {}, got {}",
                MAX_ITERATIONS, self.iterations
            )));
        }
        Ok(())
    }
}

/// Key wrapper with automatic zeroization on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_LEN],
}

impl DerivedKey {
    /// Create a new derived key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { key: bytes }
    }

    /// Get the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Derive a 256-bit key from a password.
///
/// Any password is accepted, including the empty one.
pub fn derive_key(
    password: &[u8],
    salt: &[u8; SALT_LEN],
    params: &KdfParams,
) -> CryptoResult<DerivedKey> {
    params.validate()?;

    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha512>(password, salt, params.iterations, &mut key);

    let derived = DerivedKey::from_bytes(key);
    key.zeroize();
    Ok(derived)
}

/// Derive `output_len` bytes from a password.
///
/// General form of [`derive_key`]; rejects zero-length and over-long output.
pub fn derive_bytes(
    password: &[u8],
    salt: &[u8],
    params: &KdfParams,
    output_len: usize,
) -> CryptoResult<zeroize::Zeroizing<Vec<u8>>> {
    params.validate()?;

    if salt.len() != SALT_LEN {
        return Err(CryptoError::InvalidKdfParams(format!(
            "salt must be {} bytes, got {}",
            SALT_LEN,
            salt.len()
        )));
    }
    if output_len == 0 || output_len > MAX_OUTPUT_LEN {
        return Err(CryptoError::InvalidKdfParams(format!(
            "output length must be between 1 and {}, got {}",
            MAX_OUTPUT_LEN, output_len
        )));
    }

    let mut out = zeroize::Zeroizing::new(vec![0u8; output_len]);
    pbkdf2_hmac::<Sha512>(password, salt, params.iterations, &mut out);
    Ok(out)
}
