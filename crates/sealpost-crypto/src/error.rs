//! Error types for cryptographic operations.

use thiserror::Error;

/// Cryptographic operation errors.
///
/// The first four variants are the protocol failures. They are terminal for
/// the operation that produced them and carry no detail about which input was
/// at fault.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// AES-GCM tag mismatch - tampered data or wrong key.
    #[error("Authentication failed - data may be tampered")]
    AuthenticationFailure,

    /// The wrapped file key could not be recovered with this private key.
    #[error("Key unwrap failed - not the intended recipient or malformed key")]
    UnwrapFailure,

    /// Signature does not verify under the sender's public key.
    #[error("Signature invalid - sender identity could not be established")]
    SignatureInvalid,

    /// Private key envelope could not be opened.
    #[error("Wrong password or corrupt private key envelope")]
    WrongPasswordOrCorruptEnvelope,

    /// Key derivation parameters out of range.
    #[error("Invalid KDF parameters: {0}")]
    InvalidKdfParams(String),

    /// Envelope rejected at the boundary (bad field length, bad encoding).
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// Key material could not be parsed or is unsuitable.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Key pair generation failed.
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// Username does not satisfy the username rules.
    #[error("Invalid user id: {0}")]
    InvalidUserId(String),

    /// Encryption failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CryptoError {
    /// True for the protocol failures that must abort a seal/open flow.
    pub fn is_protocol_failure(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailure
                | Self::UnwrapFailure
                | Self::SignatureInvalid
                | Self::WrongPasswordOrCorruptEnvelope
        )
    }
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
