//! Share workflow: the client side of register, upload and download.
//!
//! This is the only layer that talks to the directory. Every round trip is
//! bounded by [`ShareConfig::request_timeout`]; CPU-heavy key generation and
//! password derivation run on the blocking pool.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use sealpost_crypto::{
    open_file, open_private_key, seal_file, seal_private_key, KeyPair, PrivateKey,
    PrivateKeyEnvelope, UserId,
};

use crate::config::ShareConfig;
use crate::directory::{
    Directory, FileId, LoginRequest, RegisterRequest, SharedFileSummary, UploadRequest,
};
use crate::error::{ShareError, ShareResult};

/// Outcome of a successful registration.
pub struct Registration {
    /// User id assigned by the directory.
    pub id: u64,
    pub user: UserId,
    /// Freshly generated key pair; the caller decides whether to keep it.
    pub keys: KeyPair,
    /// The sealed private key as published to the directory.
    pub envelope: PrivateKeyEnvelope,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("user", &self.user)
            .field("public_key", &self.keys.public)
            .finish_non_exhaustive()
    }
}

/// An account recovered from the directory at login.
pub struct Account {
    /// User id assigned by the directory.
    pub id: u64,
    pub user: UserId,
    /// Key pair opened from the published envelope.
    pub keys: KeyPair,
    /// The sealed private key as stored by the directory.
    pub envelope: PrivateKeyEnvelope,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("user", &self.user)
            .field("public_key", &self.keys.public)
            .finish_non_exhaustive()
    }
}

/// A downloaded, verified and decrypted file.
pub struct OpenedFile {
    pub id: FileId,
    /// Name as chosen by the sender; not a safe path.
    pub name: String,
    /// Sender whose signature was verified.
    pub from_user: UserId,
    pub contents: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for OpenedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedFile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("from_user", &self.from_user)
            .field("len", &self.contents.len())
            .finish()
    }
}

/// Orchestrates envelopes against a [`Directory`].
pub struct ShareWorkflow {
    directory: Arc<dyn Directory>,
    config: ShareConfig,
}

impl ShareWorkflow {
    /// Create a workflow over `directory`.
    pub fn new(directory: Arc<dyn Directory>, config: ShareConfig) -> ShareResult<Self> {
        config.validate()?;
        Ok(Self { directory, config })
    }

    /// Get the current configuration.
    pub fn config(&self) -> &ShareConfig {
        &self.config
    }

    async fn round_trip<T, F>(&self, op: &'static str, request: F) -> ShareResult<T>
    where
        F: Future<Output = ShareResult<T>>,
    {
        let start = Instant::now();
        let result = tokio::time::timeout(self.config.request_timeout, request)
            .await
            .map_err(|_| ShareError::Timeout(self.config.request_timeout))?;

        debug!(
            component = "workflow",
            op,
            success = result.is_ok(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Directory round trip"
        );
        result
    }

    /// Generate a key pair, seal the private key under `password` and
    /// publish both to the directory.
    pub async fn register(&self, username: &str, password: &str) -> ShareResult<Registration> {
        let user = UserId::new(username)?;

        let bits = self.config.rsa_bits;
        let start = Instant::now();
        let keys = tokio::task::spawn_blocking(move || KeyPair::generate_with_bits(bits)).await??;
        debug!(
            component = "workflow",
            op = "register",
            user = %user,
            key_fingerprint = %keys.public.fingerprint(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Generated key pair"
        );

        self.publish(user, password, keys).await
    }

    /// Publish an existing key pair for a new account.
    ///
    /// The private key is sealed under `password` with the configured KDF
    /// parameters before it leaves the process.
    pub async fn register_with_keys(
        &self,
        username: &str,
        password: &str,
        keys: KeyPair,
    ) -> ShareResult<Registration> {
        let user = UserId::new(username)?;
        self.publish(user, password, keys).await
    }

    async fn publish(&self, user: UserId, password: &str, keys: KeyPair) -> ShareResult<Registration> {
        let password = Zeroizing::new(password.to_string());
        let kdf = self.config.kdf;
        let private = keys.private.clone();
        let sealing_password = password.clone();
        let envelope = tokio::task::spawn_blocking(move || {
            seal_private_key(&private, &sealing_password, &kdf)
        })
        .await??;

        let request = RegisterRequest {
            username: user.clone(),
            password,
            public_key: keys.public.clone(),
            private_key_envelope: envelope.clone(),
        };
        let id = self
            .round_trip("register", self.directory.register(request))
            .await?;

        info!(
            component = "workflow",
            op = "register",
            user = %user,
            user_id = id,
            key_fingerprint = %keys.public.fingerprint(),
            "Registered user"
        );
        Ok(Registration {
            id,
            user,
            keys,
            envelope,
        })
    }

    /// Log in and recover the account's key pair from the directory.
    ///
    /// The sealed private key is opened locally with `password`, and must
    /// match the public key the directory publishes for the user.
    pub async fn login(&self, username: &str, password: &str) -> ShareResult<Account> {
        let user = UserId::new(username)?;
        let request = LoginRequest {
            username: user.clone(),
            auth_password: Zeroizing::new(password.to_string()),
        };
        let account = self
            .round_trip("login", self.directory.login(request))
            .await?;

        let private = self.unlock(&account.private_key_envelope, password).await?;
        let keys = KeyPair::from_private(private);
        if keys.public != account.public_key {
            warn!(
                component = "workflow",
                op = "login",
                user = %user,
                key_fingerprint = %account.public_key.fingerprint(),
                "Sealed private key does not match published public key"
            );
            return Err(ShareError::KeyMismatch(user.to_string()));
        }

        info!(
            component = "workflow",
            op = "login",
            user = %user,
            key_fingerprint = %keys.public.fingerprint(),
            "Logged in"
        );
        Ok(Account {
            id: account.id,
            user,
            keys,
            envelope: account.private_key_envelope,
        })
    }

    /// Open a sealed private key with the account password.
    pub async fn unlock(
        &self,
        envelope: &PrivateKeyEnvelope,
        password: &str,
    ) -> ShareResult<PrivateKey> {
        let envelope = envelope.clone();
        let password = Zeroizing::new(password.to_string());
        let key = tokio::task::spawn_blocking(move || open_private_key(&envelope, &password))
            .await?
            .map_err(|e| {
                warn!(component = "workflow", op = "unlock", "Private key envelope did not open");
                ShareError::from(e)
            })?;
        Ok(key)
    }

    /// Seal `plaintext` for `recipient` and store it in the directory.
    ///
    /// The recipient's public key is fetched from the directory for every
    /// upload.
    pub async fn upload(
        &self,
        sender: &UserId,
        sender_key: &PrivateKey,
        recipient: &UserId,
        name: &str,
        plaintext: &[u8],
    ) -> ShareResult<FileId> {
        let recipient_key = self
            .round_trip("public_key", self.directory.public_key(recipient))
            .await?;

        let envelope = seal_file(name, plaintext, sender, sender_key, recipient, &recipient_key)?;
        let id = self
            .round_trip("upload", self.directory.upload(UploadRequest::new(envelope)))
            .await?;

        info!(
            component = "workflow",
            op = "upload",
            file_id = id.0,
            file_name = %name,
            from_user = %sender,
            to_user = %recipient,
            size_bytes = plaintext.len() as u64,
            "Uploaded file"
        );
        Ok(id)
    }

    /// Fetch, verify and decrypt a file addressed to `caller`.
    ///
    /// The envelope's `toUser` must name the caller, and the sender's public
    /// key is fetched fresh rather than taken from any cache.
    pub async fn download(
        &self,
        caller: &UserId,
        caller_key: &PrivateKey,
        id: FileId,
    ) -> ShareResult<OpenedFile> {
        let envelope = self
            .round_trip("download", self.directory.download(id))
            .await?;

        if envelope.to_user != *caller {
            warn!(
                component = "workflow",
                op = "download",
                file_id = id.0,
                to_user = %envelope.to_user,
                user = %caller,
                "Envelope is addressed to another user"
            );
            return Err(ShareError::NotRecipient {
                id: id.0,
                to_user: envelope.to_user.to_string(),
                caller: caller.to_string(),
            });
        }

        let sender_key = self
            .round_trip("public_key", self.directory.public_key(&envelope.from_user))
            .await?;

        let contents = open_file(&envelope, caller_key, &sender_key).map_err(|e| {
            if e.is_protocol_failure() {
                warn!(
                    component = "workflow",
                    op = "download",
                    file_id = id.0,
                    from_user = %envelope.from_user,
                    error = %e,
                    "Rejected file envelope"
                );
            }
            ShareError::from(e)
        })?;

        info!(
            component = "workflow",
            op = "download",
            file_id = id.0,
            file_name = %envelope.name,
            from_user = %envelope.from_user,
            size_bytes = contents.len() as u64,
            "Downloaded file"
        );
        Ok(OpenedFile {
            id,
            name: envelope.name.clone(),
            from_user: envelope.from_user.clone(),
            contents,
        })
    }

    /// Files the directory lists as addressed to `caller`.
    pub async fn shared_with(&self, caller: &UserId) -> ShareResult<Vec<SharedFileSummary>> {
        let files = self
            .round_trip("shared_with", self.directory.shared_with(caller))
            .await?;
        debug!(
            component = "workflow",
            op = "shared_with",
            user = %caller,
            result_count = files.len(),
            "Listed shared files"
        );
        Ok(files)
    }

    /// Every registered username.
    pub async fn users(&self) -> ShareResult<Vec<UserId>> {
        let records = self.round_trip("users", self.directory.users()).await?;
        debug!(component = "workflow", op = "users", result_count = records.len(), "Listed users");
        Ok(records.into_iter().map(|r| r.username).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDirectory;
    use crate::test_support::{fast_config, seed};
    use sealpost_crypto::CryptoError;
    use std::time::Duration;

    #[tokio::test]
    async fn test_upload_then_download() {
        let directory = Arc::new(MemoryDirectory::new());
        let (alice, bob) = seed(&directory).await;
        let workflow = ShareWorkflow::new(directory.clone(), fast_config()).unwrap();

        let id = workflow
            .upload(&alice.user, &alice.keys.private, &bob.user, "notes.txt", b"hi bob")
            .await
            .unwrap();

        let opened = workflow.download(&bob.user, &bob.keys.private, id).await.unwrap();
        assert_eq!(opened.name, "notes.txt");
        assert_eq!(opened.from_user, alice.user);
        assert_eq!(opened.contents.as_slice(), b"hi bob");
    }

    #[tokio::test]
    async fn test_download_rejects_misaddressed_envelope() {
        let directory = Arc::new(MemoryDirectory::new());
        let (alice, bob) = seed(&directory).await;
        let workflow = ShareWorkflow::new(directory.clone(), fast_config()).unwrap();

        let id = workflow
            .upload(&alice.user, &alice.keys.private, &bob.user, "x", b"for bob")
            .await
            .unwrap();

        // Alice holds a valid key, but the file is not hers
        let result = workflow.download(&alice.user, &alice.keys.private, id).await;
        match result {
            Err(ShareError::NotRecipient { to_user, caller, .. }) => {
                assert_eq!(to_user, "bob");
                assert_eq!(caller, "alice");
            }
            other => panic!("expected NotRecipient, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_download_uses_current_sender_key() {
        let directory = Arc::new(MemoryDirectory::new());
        let (alice, bob) = seed(&directory).await;
        let workflow = ShareWorkflow::new(directory.clone(), fast_config()).unwrap();

        let id = workflow
            .upload(&alice.user, &alice.keys.private, &bob.user, "x", b"data")
            .await
            .unwrap();

        directory
            .replace_public_key(&alice.user, bob.keys.public.clone())
            .await
            .unwrap();

        let result = workflow.download(&bob.user, &bob.keys.private, id).await;
        assert!(matches!(
            result,
            Err(ShareError::Crypto(CryptoError::SignatureInvalid))
        ));
    }

    #[tokio::test]
    async fn test_upload_to_unknown_user() {
        let directory = Arc::new(MemoryDirectory::new());
        let (alice, _) = seed(&directory).await;
        let workflow = ShareWorkflow::new(directory.clone(), fast_config()).unwrap();

        let nobody = UserId::new("nobody").unwrap();
        let result = workflow
            .upload(&alice.user, &alice.keys.private, &nobody, "x", b"data")
            .await;
        assert!(matches!(result, Err(ShareError::NotFound(_))));
        assert_eq!(directory.file_count().await, 0);
    }

    #[tokio::test]
    async fn test_login_recovers_published_keys() {
        let directory = Arc::new(MemoryDirectory::new());
        let (alice, _) = seed(&directory).await;
        let workflow = ShareWorkflow::new(directory.clone(), fast_config()).unwrap();

        let account = workflow.login("alice", "password").await.unwrap();
        assert_eq!(account.id, 1);
        assert_eq!(account.user, alice.user);
        assert_eq!(account.keys.public, alice.keys.public);
    }

    #[tokio::test]
    async fn test_login_rejects_key_not_matching_published_one() {
        let directory = Arc::new(MemoryDirectory::new());
        let (alice, bob) = seed(&directory).await;
        let workflow = ShareWorkflow::new(directory.clone(), fast_config()).unwrap();

        directory
            .replace_public_key(&alice.user, bob.keys.public.clone())
            .await
            .unwrap();

        let err = workflow.login("alice", "password").await.unwrap_err();
        assert!(matches!(err, ShareError::KeyMismatch(ref user) if user == "alice"));
        assert!(err.is_security_failure());
    }

    #[tokio::test]
    async fn test_register_with_existing_keys() {
        let directory = Arc::new(MemoryDirectory::new());
        let (alice, _) = seed(&directory).await;
        let workflow = ShareWorkflow::new(directory.clone(), fast_config()).unwrap();

        let keys = KeyPair::from_private(alice.keys.private.clone());
        let registration = workflow
            .register_with_keys("alice_two", "another-password", keys)
            .await
            .unwrap();
        assert_eq!(registration.keys.public, alice.keys.public);

        let published = directory.public_key(&registration.user).await.unwrap();
        assert_eq!(published, alice.keys.public);
        let reopened = workflow
            .unlock(&registration.envelope, "another-password")
            .await
            .unwrap();
        assert_eq!(reopened.public_key(), alice.keys.public);
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_config() {
        let config = ShareConfig {
            request_timeout: Duration::ZERO,
            ..fast_config()
        };
        let result = ShareWorkflow::new(Arc::new(MemoryDirectory::new()), config);
        assert!(matches!(result, Err(ShareError::Config(_))));
    }

    #[tokio::test]
    async fn test_users_lists_usernames() {
        let directory = Arc::new(MemoryDirectory::new());
        seed(&directory).await;
        let workflow = ShareWorkflow::new(directory, fast_config()).unwrap();

        let users = workflow.users().await.unwrap();
        let names: Vec<&str> = users.iter().map(|u| u.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
    }
}
