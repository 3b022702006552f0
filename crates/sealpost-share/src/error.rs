//! Error types for the share workflow.

use std::time::Duration;

use sealpost_crypto::CryptoError;
use thiserror::Error;

/// Result type alias using sealpost-share's Error type.
pub type ShareResult<T> = std::result::Result<T, ShareError>;

/// Errors raised while sharing files through a directory.
#[derive(Error, Debug)]
pub enum ShareError {
    /// Cryptographic failure, passed through unchanged.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The directory has no such user or file.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The downloaded envelope is addressed to someone else.
    #[error("File {id} is addressed to {to_user}, not {caller}")]
    NotRecipient {
        id: u64,
        to_user: String,
        caller: String,
    },

    /// The private key served at login does not match the published public key.
    #[error("Private key for {0} does not match its published public key")]
    KeyMismatch(String),

    /// The directory answered with a non-success status.
    #[error("Directory returned {status}: {message}")]
    Directory { status: u16, message: String },

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// The directory did not answer in time.
    #[error("Directory request timed out after {0:?}")]
    Timeout(Duration),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A blocking worker task panicked or was cancelled.
    #[error("Worker error: {0}")]
    Worker(String),
}

impl ShareError {
    /// True when the failure came from the cryptographic protocol.
    ///
    /// These are never retried and must be surfaced to the user as-is.
    pub fn is_security_failure(&self) -> bool {
        match self {
            Self::Crypto(e) => e.is_protocol_failure(),
            Self::NotRecipient { .. } | Self::KeyMismatch(_) => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for ShareError {
    fn from(e: serde_json::Error) -> Self {
        ShareError::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for ShareError {
    fn from(e: reqwest::Error) -> Self {
        ShareError::Request(e.to_string())
    }
}

impl From<tokio::task::JoinError> for ShareError {
    fn from(e: tokio::task::JoinError) -> Self {
        ShareError::Worker(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_errors_pass_through() {
        let err: ShareError = CryptoError::SignatureInvalid.into();
        assert!(matches!(err, ShareError::Crypto(CryptoError::SignatureInvalid)));
        assert_eq!(err.to_string(), CryptoError::SignatureInvalid.to_string());
    }

    #[test]
    fn test_security_failures() {
        assert!(ShareError::from(CryptoError::UnwrapFailure).is_security_failure());
        assert!(ShareError::from(CryptoError::AuthenticationFailure).is_security_failure());
        assert!(ShareError::NotRecipient {
            id: 7,
            to_user: "bob".into(),
            caller: "carol".into(),
        }
        .is_security_failure());
        assert!(ShareError::KeyMismatch("alice".into()).is_security_failure());

        assert!(!ShareError::from(CryptoError::InvalidKey("bad pem".into())).is_security_failure());
        assert!(!ShareError::NotFound("user alice".into()).is_security_failure());
        assert!(!ShareError::Timeout(Duration::from_secs(1)).is_security_failure());
    }

    #[test]
    fn test_error_display_directory() {
        let err = ShareError::Directory {
            status: 409,
            message: "Username is already taken".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Directory returned 409: Username is already taken"
        );
    }

    #[test]
    fn test_error_display_not_recipient() {
        let err = ShareError::NotRecipient {
            id: 3,
            to_user: "bob".to_string(),
            caller: "carol".to_string(),
        };
        assert_eq!(err.to_string(), "File 3 is addressed to bob, not carol");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: ShareError = json_err.into();
        assert!(matches!(err, ShareError::Serialization(_)));
    }
}
