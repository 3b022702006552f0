//! RSA key pairs for key wrapping and signing.
//!
//! This module provides:
//! - Key pair generation (RSA, 4096-bit modulus by default)
//! - PEM import/export (SPKI for public keys, PKCS#8 for private keys)
//! - Public key file helpers
//!
//! # Security
//!
//! - Private keys are zeroized on drop (by the `rsa` crate)
//! - Private key PEM text is only handed out inside `Zeroizing`
//! - `Debug` output never contains private key material

use rsa::pkcs8::{
    DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding,
};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};

/// Default modulus size in bits.
pub const DEFAULT_MODULUS_BITS: usize = 4096;

/// Smallest modulus accepted for generation or import.
pub const MIN_MODULUS_BITS: usize = 2048;

/// Largest modulus accepted for generation or import.
///
/// `rsa` refuses to parse public keys above this size.
pub const MAX_MODULUS_BITS: usize = 4096;

/// RSA public key.
///
/// Public keys are published through the directory and used by senders to
/// wrap file keys and by recipients to verify signatures.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(RsaPublicKey);

impl PublicKey {
    /// Parse an SPKI PEM public key.
    pub fn from_pem(pem: &str) -> CryptoResult<Self> {
        let key = RsaPublicKey::from_public_key_pem(pem.trim())
            .map_err(|e| CryptoError::InvalidKey(format!("Invalid public key PEM: {}", e)))?;
        check_modulus(key.size() * 8)?;
        Ok(Self(key))
    }

    /// Encode as SPKI PEM.
    pub fn to_pem(&self) -> CryptoResult<String> {
        self.0
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::InvalidKey(format!("Public key encoding failed: {}", e)))
    }

    /// Modulus size in bits.
    pub fn modulus_bits(&self) -> usize {
        self.0.size() * 8
    }

    /// Short SHA-256 fingerprint of the DER encoding, hex.
    pub fn fingerprint(&self) -> String {
        let der = match self.0.to_public_key_der() {
            Ok(der) => der,
            Err(_) => return "unencodable".to_string(),
        };
        let digest = Sha256::digest(der.as_bytes());
        hex::encode(&digest[..8])
    }

    pub(crate) fn as_rsa(&self) -> &RsaPublicKey {
        &self.0
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PublicKey(rsa{}, {})",
            self.modulus_bits(),
            self.fingerprint()
        )
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let pem = self.to_pem().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&pem)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_pem(&s).map_err(serde::de::Error::custom)
    }
}

/// RSA private key with automatic zeroization.
#[derive(Clone)]
pub struct PrivateKey(RsaPrivateKey);

impl PrivateKey {
    /// Parse a PKCS#8 PEM private key.
    pub fn from_pem(pem: &str) -> CryptoResult<Self> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem.trim())
            .map_err(|e| CryptoError::InvalidKey(format!("Invalid private key PEM: {}", e)))?;
        key.validate()
            .map_err(|e| CryptoError::InvalidKey(format!("Inconsistent private key: {}", e)))?;
        check_modulus(key.size() * 8)?;
        Ok(Self(key))
    }

    /// Parse PEM text held as bytes (e.g. freshly opened from an envelope).
    pub fn from_pem_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let pem = std::str::from_utf8(bytes)
            .map_err(|_| CryptoError::InvalidKey("Private key PEM is not UTF-8".to_string()))?;
        Self::from_pem(pem)
    }

    /// Encode as PKCS#8 PEM.
    pub fn to_pem(&self) -> CryptoResult<Zeroizing<String>> {
        self.0
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::InvalidKey(format!("Private key encoding failed: {}", e)))
    }

    /// Derive the corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(RsaPublicKey::from(&self.0))
    }

    pub(crate) fn as_rsa(&self) -> &RsaPrivateKey {
        &self.0
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// RSA key pair used for both OAEP key wrapping and PSS signing.
pub struct KeyPair {
    /// The public key (can be shared).
    pub public: PublicKey,
    /// The private key (must be kept secret).
    pub private: PrivateKey,
}

impl KeyPair {
    /// Generate a new key pair with a 4096-bit modulus.
    ///
    /// CPU-bound; async callers should run it on a blocking worker.
    pub fn generate() -> CryptoResult<Self> {
        Self::generate_with_bits(DEFAULT_MODULUS_BITS)
    }

    /// Generate a new key pair with the given modulus size.
    pub fn generate_with_bits(bits: usize) -> CryptoResult<Self> {
        check_modulus(bits)?;

        let started = std::time::Instant::now();
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), bits)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        tracing::debug!(
            modulus_bits = bits,
            duration_ms = started.elapsed().as_millis() as u64,
            "Generated RSA key pair"
        );

        Ok(Self::from_private(PrivateKey(private)))
    }

    /// Create a key pair from an existing private key.
    pub fn from_private(private: PrivateKey) -> Self {
        let public = private.public_key();
        Self { public, private }
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .field("private", &"[REDACTED]")
            .finish()
    }
}

fn check_modulus(bits: usize) -> CryptoResult<()> {
    if !(MIN_MODULUS_BITS..=MAX_MODULUS_BITS).contains(&bits) {
        return Err(CryptoError::InvalidKey(format!(
            "RSA modulus must be between {} and {} bits, got {}",
            MIN_MODULUS_BITS, MAX_MODULUS_BITS, bits
        )));
    }
    Ok(())
}

/// Save a public key to a PEM file.
pub fn save_public_key(key: &PublicKey, path: &Path) -> CryptoResult<()> {
    std::fs::write(path, key.to_pem()?)?;
    Ok(())
}

/// Load a public key from a PEM file.
pub fn load_public_key(path: &Path) -> CryptoResult<PublicKey> {
    let contents = std::fs::read_to_string(path)?;
    PublicKey::from_pem(&contents)
}

// Hex encoding for fingerprints (internal helper)
mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
