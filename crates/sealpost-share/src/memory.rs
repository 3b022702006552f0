//! In-process directory for tests and local demos.
//!
//! Behaves like the HTTP directory: unique usernames, 1-based ids, unknown
//! users and files are `NotFound`. It can also be made to misbehave
//! ([`MemoryDirectory::tamper`], [`MemoryDirectory::replace_public_key`]) so
//! the client-side checks can be exercised against a hostile store.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;
use zeroize::Zeroizing;

use sealpost_crypto::{FileEnvelope, PrivateKeyEnvelope, PublicKey, UserId};

use crate::directory::{
    AccountRecord, Directory, FileId, LoginRequest, RegisterRequest, SharedFileSummary,
    UploadRequest, UserRecord,
};
use crate::error::{ShareError, ShareResult};

#[derive(Clone)]
struct StoredUser {
    id: u64,
    password: Zeroizing<String>,
    public_key: PublicKey,
    private_key_envelope: PrivateKeyEnvelope,
}

#[derive(Default)]
struct State {
    users: BTreeMap<UserId, StoredUser>,
    files: BTreeMap<FileId, FileEnvelope>,
    next_user_id: u64,
    next_file_id: u64,
}

/// [`Directory`] held in memory behind an async lock.
#[derive(Default)]
pub struct MemoryDirectory {
    state: RwLock<State>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// The sealed private key a user registered with.
    pub async fn private_key_envelope(&self, username: &UserId) -> ShareResult<PrivateKeyEnvelope> {
        let state = self.state.read().await;
        state
            .users
            .get(username)
            .map(|u| u.private_key_envelope.clone())
            .ok_or_else(|| ShareError::NotFound(format!("user {}", username)))
    }

    /// Mutate a stored envelope in place.
    pub async fn tamper<F>(&self, id: FileId, f: F) -> ShareResult<()>
    where
        F: FnOnce(&mut FileEnvelope),
    {
        let mut state = self.state.write().await;
        let envelope = state
            .files
            .get_mut(&id)
            .ok_or_else(|| ShareError::NotFound(format!("file {}", id)))?;
        f(envelope);
        Ok(())
    }

    /// Rebind a username to a different public key.
    pub async fn replace_public_key(&self, username: &UserId, key: PublicKey) -> ShareResult<()> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(username)
            .ok_or_else(|| ShareError::NotFound(format!("user {}", username)))?;
        user.public_key = key;
        Ok(())
    }

    /// Number of stored file envelopes.
    pub async fn file_count(&self) -> usize {
        self.state.read().await.files.len()
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn public_key(&self, username: &UserId) -> ShareResult<PublicKey> {
        let state = self.state.read().await;
        state
            .users
            .get(username)
            .map(|u| u.public_key.clone())
            .ok_or_else(|| ShareError::NotFound(format!("user {}", username)))
    }

    async fn register(&self, request: RegisterRequest) -> ShareResult<u64> {
        let mut state = self.state.write().await;
        if state.users.contains_key(&request.username) {
            return Err(ShareError::Directory {
                status: 409,
                message: "Username is already taken".to_string(),
            });
        }

        state.next_user_id += 1;
        let id = state.next_user_id;
        debug!(component = "memory_directory", user = %request.username, user_id = id, "Registered user");
        state.users.insert(
            request.username,
            StoredUser {
                id,
                password: request.password,
                public_key: request.public_key,
                private_key_envelope: request.private_key_envelope,
            },
        );
        Ok(id)
    }

    async fn login(&self, request: LoginRequest) -> ShareResult<AccountRecord> {
        let state = self.state.read().await;
        // Unknown users and wrong passwords look the same
        let user = state
            .users
            .get(&request.username)
            .filter(|u| *u.password == *request.auth_password)
            .ok_or_else(|| ShareError::Directory {
                status: 401,
                message: "Invalid username or password".to_string(),
            })?;

        debug!(component = "memory_directory", user = %request.username, "Logged in");
        Ok(AccountRecord {
            id: user.id,
            username: request.username.clone(),
            public_key: user.public_key.clone(),
            private_key_envelope: user.private_key_envelope.clone(),
        })
    }

    async fn upload(&self, request: UploadRequest) -> ShareResult<FileId> {
        request.file.validate()?;

        let mut state = self.state.write().await;
        for name in [&request.from_username, &request.to_username] {
            if !state.users.contains_key(name) {
                return Err(ShareError::NotFound(format!("user {}", name)));
            }
        }

        state.next_file_id += 1;
        let id = FileId(state.next_file_id);
        debug!(
            component = "memory_directory",
            file_id = id.0,
            from_user = %request.from_username,
            to_user = %request.to_username,
            "Stored file envelope"
        );
        state.files.insert(id, request.file);
        Ok(id)
    }

    async fn download(&self, id: FileId) -> ShareResult<FileEnvelope> {
        let state = self.state.read().await;
        state
            .files
            .get(&id)
            .cloned()
            .ok_or_else(|| ShareError::NotFound(format!("file {}", id)))
    }

    async fn shared_with(&self, username: &UserId) -> ShareResult<Vec<SharedFileSummary>> {
        let state = self.state.read().await;
        if !state.users.contains_key(username) {
            return Err(ShareError::NotFound(format!("user {}", username)));
        }
        Ok(state
            .files
            .iter()
            .filter(|(_, f)| f.to_user == *username)
            .map(|(id, f)| SharedFileSummary {
                id: *id,
                name: f.name.clone(),
                size: f.size,
                from_user: f.from_user.clone(),
            })
            .collect())
    }

    async fn users(&self) -> ShareResult<Vec<UserRecord>> {
        let state = self.state.read().await;
        let mut users: Vec<(&UserId, &StoredUser)> = state.users.iter().collect();
        users.sort_by_key(|(_, u)| u.id);
        Ok(users
            .into_iter()
            .map(|(name, u)| UserRecord {
                username: name.clone(),
                public_key: u.public_key.clone(),
            })
            .collect())
    }
}
