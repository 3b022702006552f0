//! # sealpost-crypto
//!
//! Envelope cryptography for sealpost.
//!
//! A user encrypts a file so that exactly one other user can read it. The
//! directory that stores and relays envelopes never sees plaintext or
//! private keys.
//!
//! ## Cryptographic Primitives
//!
//! - **Symmetric cipher**: AES-256-GCM (AEAD, detached 16-byte tag)
//! - **Key derivation**: PBKDF2-HMAC-SHA512, 210 000 iterations by default
//! - **Key pair**: RSA, 4096-bit modulus by default
//! - **Key wrapping**: RSA-OAEP with SHA-256
//! - **Signatures**: RSASSA-PSS with SHA-256, over the ciphertext
//!
//! ## Envelopes
//!
//! ```text
//! PrivateKeyEnvelope { salt(16), iv(12), ciphertext, authTag(16) }
//!     password --PBKDF2--> key --AES-GCM--> PKCS#8 PEM
//!
//! FileEnvelope { name, size, ciphertext, iv(12), authTag(16),
//!                wrappedKey, signature, fromUser, toUser }
//!     file key --OAEP--> wrappedKey
//!     ciphertext --PSS(sender)--> signature
//! ```
//!
//! ## Examples
//!
//! ### Seal a private key under a password
//!
//! ```rust
//! use sealpost_crypto::{CryptoError, PrivateKeyEnvelope};
//!
//! let envelope = PrivateKeyEnvelope::seal(&[1, 2, 3, 4, 5, 6, 7, 8], "Password123!").unwrap();
//! assert_eq!(envelope.open("Password123!").unwrap().as_slice(), &[1, 2, 3, 4, 5, 6, 7, 8]);
//! assert!(matches!(
//!     envelope.open("WrongPassword!"),
//!     Err(CryptoError::WrongPasswordOrCorruptEnvelope)
//! ));
//! ```
//!
//! ### Share a file
//!
//! ```rust,no_run
//! use sealpost_crypto::{open_file, seal_file, KeyPair, UserId};
//!
//! let alice = KeyPair::generate().unwrap();
//! let bob = KeyPair::generate().unwrap();
//! let (a, b) = (UserId::new("alice").unwrap(), UserId::new("bob").unwrap());
//!
//! let envelope = seal_file("plan.txt", b"Meet at noon", &a, &alice.private, &b, &bob.public).unwrap();
//! let plaintext = open_file(&envelope, &bob.private, &alice.public).unwrap();
//! assert_eq!(plaintext.as_slice(), b"Meet at noon");
//! ```

pub mod cipher;
pub mod error;
pub mod file_envelope;
pub mod format;
pub mod kdf;
pub mod key_envelope;
pub mod keys;
pub mod sign;
pub mod user;
pub mod wrap;

// Re-export commonly used types
pub use cipher::SymmetricKey;
pub use error::{CryptoError, CryptoResult};
pub use file_envelope::{open_file, seal_file, FileEnvelope, FileEnvelopeParts};
pub use format::{base64_decode, base64_encode};
pub use kdf::{derive_key, DerivedKey, KdfParams};
pub use key_envelope::{
    load_private_key, open_private_key, save_private_key, seal_private_key, PrivateKeyEnvelope,
};
pub use keys::{load_public_key, save_public_key, KeyPair, PrivateKey, PublicKey};
pub use user::UserId;

/// Shared 2048-bit key pairs for unit tests; RSA generation is too slow to
/// repeat per test.
#[cfg(test)]
pub(crate) mod test_keys {
    use std::sync::OnceLock;

    use crate::keys::KeyPair;

    static ALICE: OnceLock<KeyPair> = OnceLock::new();
    static BOB: OnceLock<KeyPair> = OnceLock::new();
    static CAROL: OnceLock<KeyPair> = OnceLock::new();

    fn generate() -> KeyPair {
        KeyPair::generate_with_bits(2048).unwrap()
    }

    pub fn alice() -> &'static KeyPair {
        ALICE.get_or_init(generate)
    }

    pub fn bob() -> &'static KeyPair {
        BOB.get_or_init(generate)
    }

    pub fn carol() -> &'static KeyPair {
        CAROL.get_or_init(generate)
    }
}
