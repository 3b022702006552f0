//! The directory collaborator and its wire types.
//!
//! The directory stores public keys, sealed private keys and file envelopes.
//! It is untrusted: nothing it returns is believed without a cryptographic
//! check on the client side.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use sealpost_crypto::{FileEnvelope, PrivateKeyEnvelope, PublicKey, UserId};

use crate::error::ShareResult;

/// Directory-assigned identifier of a stored file envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub u64);

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for FileId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(FileId)
    }
}

/// A registered user and the public key the directory binds to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub username: UserId,
    pub public_key: PublicKey,
}

/// Registration payload.
///
/// The password is the account password the directory authenticates with;
/// the private key travels only inside its password-sealed envelope.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: UserId,
    pub password: Zeroizing<String>,
    pub public_key: PublicKey,
    pub private_key_envelope: PrivateKeyEnvelope,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Login payload.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: UserId,
    pub auth_password: Zeroizing<String>,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("auth_password", &"[REDACTED]")
            .finish()
    }
}

/// A user's account as returned to them at login.
///
/// Carries the sealed private key published at registration, so a user can
/// recover their keys on a machine that has never held them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub id: u64,
    pub username: UserId,
    pub public_key: PublicKey,
    #[serde(alias = "encryptedPrivateKey")]
    pub private_key_envelope: PrivateKeyEnvelope,
}

/// Upload payload: a sealed file plus its routing labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub from_username: UserId,
    pub to_username: UserId,
    pub file: FileEnvelope,
}

impl UploadRequest {
    /// Build an upload whose routing labels match the envelope.
    pub fn new(file: FileEnvelope) -> Self {
        Self {
            from_username: file.from_user.clone(),
            to_username: file.to_user.clone(),
            file,
        }
    }
}

/// Entry in a "files shared with me" listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedFileSummary {
    pub id: FileId,
    pub name: String,
    pub size: u64,
    pub from_user: UserId,
}

/// `{id}` response body for create operations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CreatedId {
    pub id: u64,
}

/// Storage and lookup service for keys and envelopes.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Look up the public key published for a user.
    async fn public_key(&self, username: &UserId) -> ShareResult<PublicKey>;

    /// Register a user; returns the directory's user id.
    async fn register(&self, request: RegisterRequest) -> ShareResult<u64>;

    /// Authenticate with the account password and fetch the account,
    /// including the sealed private key.
    async fn login(&self, request: LoginRequest) -> ShareResult<AccountRecord>;

    /// Store a file envelope; returns its id.
    async fn upload(&self, request: UploadRequest) -> ShareResult<FileId>;

    /// Fetch a stored file envelope.
    async fn download(&self, id: FileId) -> ShareResult<FileEnvelope>;

    /// List the files addressed to a user.
    async fn shared_with(&self, username: &UserId) -> ShareResult<Vec<SharedFileSummary>>;

    /// List every registered user.
    async fn users(&self) -> ShareResult<Vec<UserRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_id_is_plain_integer_on_wire() {
        assert_eq!(serde_json::to_string(&FileId(42)).unwrap(), "42");
        let id: FileId = serde_json::from_str("7").unwrap();
        assert_eq!(id, FileId(7));
        assert_eq!("19".parse::<FileId>().unwrap(), FileId(19));
        assert!("abc".parse::<FileId>().is_err());
    }

    #[test]
    fn test_shared_file_summary_wire_names() {
        let json = r#"{"id":3,"name":"a.txt","size":12,"fromUser":"alice"}"#;
        let summary: SharedFileSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.id, FileId(3));
        assert_eq!(summary.from_user.as_str(), "alice");
        assert_eq!(serde_json::to_string(&summary).unwrap(), json);
    }

    #[test]
    fn test_login_request_wire_names_and_debug() {
        let request = LoginRequest {
            username: UserId::new("alice").unwrap(),
            auth_password: Zeroizing::new("hunter22".to_string()),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["username"], "alice");
        assert_eq!(json["authPassword"], "hunter22");

        let debug = format!("{:?}", request);
        assert!(!debug.contains("hunter22"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_shared_file_summary_rejects_bad_username() {
        let json = r#"{"id":3,"name":"a.txt","size":12,"fromUser":"a/b"}"#;
        assert!(serde_json::from_str::<SharedFileSummary>(json).is_err());
    }
}
