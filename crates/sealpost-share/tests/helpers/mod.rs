//! Shared fixtures for share workflow integration tests.

#![allow(dead_code)]

use std::sync::OnceLock;
use std::time::Duration;

use sealpost_crypto::kdf::MIN_ITERATIONS;
use sealpost_crypto::{seal_private_key, KdfParams, KeyPair, UserId};
use sealpost_share::{Directory, MemoryDirectory, RegisterRequest, ShareConfig};
use zeroize::Zeroizing;

/// A named user with a key pair generated once per test binary.
pub struct Identity {
    pub user: UserId,
    pub keys: KeyPair,
}

fn identity(name: &str) -> Identity {
    Identity {
        user: UserId::new(name).unwrap(),
        keys: KeyPair::generate_with_bits(2048).unwrap(),
    }
}

pub fn alice() -> &'static Identity {
    static CELL: OnceLock<Identity> = OnceLock::new();
    CELL.get_or_init(|| identity("alice"))
}

pub fn bob() -> &'static Identity {
    static CELL: OnceLock<Identity> = OnceLock::new();
    CELL.get_or_init(|| identity("bob"))
}

pub fn carol() -> &'static Identity {
    static CELL: OnceLock<Identity> = OnceLock::new();
    CELL.get_or_init(|| identity("carol"))
}

/// Workflow settings small enough for debug-build tests.
pub fn fast_config() -> ShareConfig {
    ShareConfig {
        rsa_bits: 2048,
        kdf: KdfParams::with_iterations(MIN_ITERATIONS).unwrap(),
        request_timeout: Duration::from_secs(10),
    }
}

/// Register an existing identity directly with a memory directory.
pub async fn enroll(directory: &MemoryDirectory, who: &Identity, password: &str) {
    let envelope = seal_private_key(&who.keys.private, password, &fast_config().kdf).unwrap();
    directory
        .register(RegisterRequest {
            username: who.user.clone(),
            password: Zeroizing::new(password.to_string()),
            public_key: who.keys.public.clone(),
            private_key_envelope: envelope,
        })
        .await
        .unwrap();
}

/// `{username, publicKey}` body as the directory serves it.
pub fn user_json(who: &Identity) -> serde_json::Value {
    serde_json::json!({
        "username": who.user.as_str(),
        "publicKey": who.keys.public.to_pem().unwrap(),
    })
}
