//! Password-protected storage for private keys.
//!
//! A [`PrivateKeyEnvelope`] seals arbitrary secret bytes (in practice the
//! PKCS#8 PEM of the user's RSA key) with AES-256-GCM under a key derived
//! from the password by PBKDF2-HMAC-SHA512.
//!
//! # Wire form
//!
//! ```json
//! {
//!   "salt": "<base64, 16 bytes>",
//!   "iv": "<base64, 12 bytes>",
//!   "ciphertext": "<base64>",
//!   "authTag": "<base64, 16 bytes>",
//!   "iterations": 210000
//! }
//! ```
//!
//! Opening never tells a wrong password apart from a damaged envelope.

use serde::{Deserialize, Serialize};
use std::path::Path;
use zeroize::Zeroizing;

use crate::cipher::{self, generate_salt, IV_LEN, TAG_LEN};
use crate::error::{CryptoError, CryptoResult};
use crate::format::{base64_array, base64_bytes};
use crate::kdf::{derive_key, KdfParams, DEFAULT_ITERATIONS, SALT_LEN};
use crate::keys::PrivateKey;

/// Secret bytes sealed under a password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateKeyEnvelope {
    /// KDF salt, fresh per envelope.
    #[serde(with = "base64_array")]
    pub salt: [u8; SALT_LEN],

    /// AES-GCM IV, fresh per envelope.
    #[serde(with = "base64_array")]
    pub iv: [u8; IV_LEN],

    /// Encrypted secret.
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,

    /// AES-GCM tag.
    #[serde(with = "base64_array")]
    pub auth_tag: [u8; TAG_LEN],

    /// PBKDF2 iteration count used for this envelope.
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

fn default_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

impl PrivateKeyEnvelope {
    /// Build an envelope from raw parts, enforcing field lengths.
    pub fn from_parts(
        salt: &[u8],
        iv: &[u8],
        ciphertext: Vec<u8>,
        auth_tag: &[u8],
        iterations: u32,
    ) -> CryptoResult<Self> {
        Ok(Self {
            salt: crate::format::to_array("salt", salt)?,
            iv: crate::format::to_array("iv", iv)?,
            ciphertext,
            auth_tag: crate::format::to_array("authTag", auth_tag)?,
            iterations,
        })
    }

    /// Seal `secret` under `password` with default KDF parameters.
    pub fn seal(secret: &[u8], password: &str) -> CryptoResult<Self> {
        Self::seal_with_params(secret, password, &KdfParams::default())
    }

    /// Seal `secret` under `password`.
    pub fn seal_with_params(secret: &[u8], password: &str, params: &KdfParams) -> CryptoResult<Self> {
        let salt = generate_salt();
        let key = derive_key(password.as_bytes(), &salt, params)?;
        let sealed = cipher::encrypt(key.as_bytes(), secret)?;

        tracing::debug!(
            kdf_iterations = params.iterations,
            size_bytes = secret.len(),
            "Sealed private key envelope"
        );

        Ok(Self {
            salt,
            iv: sealed.iv,
            ciphertext: sealed.ciphertext,
            auth_tag: sealed.auth_tag,
            iterations: params.iterations,
        })
    }

    /// Open the envelope with `password`.
    ///
    /// Every failure, including an out-of-range stored iteration count, is
    /// [`CryptoError::WrongPasswordOrCorruptEnvelope`].
    pub fn open(&self, password: &str) -> CryptoResult<Zeroizing<Vec<u8>>> {
        let params = KdfParams {
            iterations: self.iterations,
        };
        let key = derive_key(password.as_bytes(), &self.salt, &params)
            .map_err(|_| CryptoError::WrongPasswordOrCorruptEnvelope)?;

        cipher::decrypt(key.as_bytes(), &self.iv, &self.ciphertext, &self.auth_tag)
            .map_err(|_| CryptoError::WrongPasswordOrCorruptEnvelope)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> CryptoResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON; malformed fields are rejected here.
    pub fn from_json(json: &str) -> CryptoResult<Self> {
        serde_json::from_str(json).map_err(|e| CryptoError::InvalidEnvelope(e.to_string()))
    }
}

/// Seal a private key's PEM under `password`.
pub fn seal_private_key(
    key: &PrivateKey,
    password: &str,
    params: &KdfParams,
) -> CryptoResult<PrivateKeyEnvelope> {
    let pem = key.to_pem()?;
    PrivateKeyEnvelope::seal_with_params(pem.as_bytes(), password, params)
}

/// Open an envelope and parse the private key inside.
pub fn open_private_key(envelope: &PrivateKeyEnvelope, password: &str) -> CryptoResult<PrivateKey> {
    let pem = envelope.open(password)?;
    PrivateKey::from_pem_bytes(&pem)
}

/// Save a private key to a JSON envelope file, sealed with `password`.
pub fn save_private_key(
    key: &PrivateKey,
    path: &Path,
    password: &str,
    params: &KdfParams,
) -> CryptoResult<()> {
    let envelope = seal_private_key(key, password, params)?;
    std::fs::write(path, envelope.to_json()?)?;
    Ok(())
}

/// Load a private key from a JSON envelope file.
pub fn load_private_key(path: &Path, password: &str) -> CryptoResult<PrivateKey> {
    let contents = std::fs::read_to_string(path)?;
    let envelope = PrivateKeyEnvelope::from_json(&contents)?;
    open_private_key(&envelope, password)
}
