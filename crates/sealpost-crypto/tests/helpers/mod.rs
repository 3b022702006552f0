//! Shared fixtures for envelope integration tests.
//!
//! RSA generation dominates test time, so each identity is generated once
//! per test binary.

use std::sync::OnceLock;

use sealpost_crypto::{KeyPair, UserId};

/// A named user with a key pair.
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

pub fn mallory() -> &'static Identity {
    static CELL: OnceLock<Identity> = OnceLock::new();
    CELL.get_or_init(|| identity("mallory"))
}
