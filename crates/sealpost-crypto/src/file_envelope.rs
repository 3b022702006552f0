//! Hybrid encryption of a file for exactly one recipient.
//!
//! # Seal
//!
//! 1. Generate a fresh 32-byte file key
//! 2. Encrypt the file with AES-256-GCM under the file key
//! 3. Wrap the file key to the recipient with RSA-OAEP
//! 4. Sign the ciphertext with the sender's private key
//! 5. Drop (zeroize) the file key
//!
//! # Open
//!
//! Steps run in this order and any failure aborts:
//!
//! 1. Unwrap the file key with the recipient's private key (`UnwrapFailure`)
//! 2. Verify the signature under the sender's public key (`SignatureInvalid`)
//! 3. Decrypt and check the tag (`AuthenticationFailure`)
//!
//! Plaintext is released only when all three succeed.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::cipher::{self, SymmetricKey, IV_LEN, TAG_LEN};
use crate::error::{CryptoError, CryptoResult};
use crate::format::{base64_array, base64_bytes, to_array};
use crate::keys::{PrivateKey, PublicKey};
use crate::sign;
use crate::user::UserId;
use crate::wrap::{unwrap_key, wrap_key};

/// Longest accepted file name, in bytes.
pub const MAX_NAME_LEN: usize = 255;

/// A file sealed by `from_user` for `to_user`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEnvelope {
    /// Original file name.
    pub name: String,

    /// Plaintext length in bytes.
    pub size: u64,

    /// AES-256-GCM ciphertext.
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,

    /// AES-GCM IV.
    #[serde(with = "base64_array")]
    pub iv: [u8; IV_LEN],

    /// AES-GCM tag.
    #[serde(with = "base64_array")]
    pub auth_tag: [u8; TAG_LEN],

    /// File key wrapped to the recipient's public key.
    #[serde(with = "base64_bytes")]
    pub wrapped_key: Vec<u8>,

    /// Sender's signature over `ciphertext`.
    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,

    /// Sender.
    pub from_user: UserId,

    /// The only user able to open the envelope.
    pub to_user: UserId,
}

/// Raw, unchecked envelope fields as they arrive from storage.
#[derive(Debug, Clone)]
pub struct FileEnvelopeParts<'a> {
    pub name: String,
    pub size: u64,
    pub ciphertext: Vec<u8>,
    pub iv: &'a [u8],
    pub auth_tag: &'a [u8],
    pub wrapped_key: Vec<u8>,
    pub signature: Vec<u8>,
    pub from_user: UserId,
    pub to_user: UserId,
}

impl FileEnvelope {
    /// Build an envelope from raw parts, enforcing presence and lengths.
    pub fn from_parts(parts: FileEnvelopeParts<'_>) -> CryptoResult<Self> {
        let envelope = Self {
            name: parts.name,
            size: parts.size,
            ciphertext: parts.ciphertext,
            iv: to_array("iv", parts.iv)?,
            auth_tag: to_array("authTag", parts.auth_tag)?,
            wrapped_key: parts.wrapped_key,
            signature: parts.signature,
            from_user: parts.from_user,
            to_user: parts.to_user,
        };
        envelope.validate()?;
        Ok(envelope)
    }

    /// Check the fields that serde cannot.
    pub fn validate(&self) -> CryptoResult<()> {
        if self.name.is_empty() {
            return Err(CryptoError::InvalidEnvelope("name is empty".into()));
        }
        if self.name.len() > MAX_NAME_LEN {
            return Err(CryptoError::InvalidEnvelope(format!(
                "name exceeds {} bytes",
                MAX_NAME_LEN
            )));
        }
        if self.wrapped_key.is_empty() {
            return Err(CryptoError::InvalidEnvelope("wrappedKey is empty".into()));
        }
        if self.signature.is_empty() {
            return Err(CryptoError::InvalidEnvelope("signature is empty".into()));
        }
        if self.ciphertext.len() as u64 != self.size {
            return Err(CryptoError::InvalidEnvelope(format!(
                "size {} does not match ciphertext length {}",
                self.size,
                self.ciphertext.len()
            )));
        }
        Ok(())
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> CryptoResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and validate from JSON.
    pub fn from_json(json: &str) -> CryptoResult<Self> {
        let envelope: Self =
            serde_json::from_str(json).map_err(|e| CryptoError::InvalidEnvelope(e.to_string()))?;
        envelope.validate()?;
        Ok(envelope)
    }
}

impl std::fmt::Debug for FileEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileEnvelope")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("ciphertext_len", &self.ciphertext.len())
            .field("wrapped_key_len", &self.wrapped_key.len())
            .field("signature_len", &self.signature.len())
            .field("from_user", &self.from_user)
            .field("to_user", &self.to_user)
            .finish()
    }
}

/// Seal `plaintext` from `from_user` to `to_user`.
///
/// # Example
///
/// ```rust,no_run
/// use sealpost_crypto::{open_file, seal_file, KeyPair, UserId};
///
/// let alice = KeyPair::generate().unwrap();
/// let bob = KeyPair::generate().unwrap();
/// let (from, to) = (UserId::new("alice").unwrap(), UserId::new("bob").unwrap());
///
/// let envelope = seal_file("notes.txt", b"hi bob", &from, &alice.private, &to, &bob.public).unwrap();
/// let plaintext = open_file(&envelope, &bob.private, &alice.public).unwrap();
/// assert_eq!(plaintext.as_slice(), b"hi bob");
/// ```
pub fn seal_file(
    name: &str,
    plaintext: &[u8],
    from_user: &UserId,
    sender_key: &PrivateKey,
    to_user: &UserId,
    recipient_key: &PublicKey,
) -> CryptoResult<FileEnvelope> {
    let envelope = {
        let file_key = SymmetricKey::generate();
        let sealed = cipher::encrypt(file_key.as_bytes(), plaintext)?;
        let wrapped_key = wrap_key(&file_key, recipient_key)?;
        let signature = sign::sign(&sealed.ciphertext, sender_key)?;

        FileEnvelope {
            name: name.to_string(),
            size: plaintext.len() as u64,
            ciphertext: sealed.ciphertext,
            iv: sealed.iv,
            auth_tag: sealed.auth_tag,
            wrapped_key,
            signature,
            from_user: from_user.clone(),
            to_user: to_user.clone(),
        }
    };
    envelope.validate()?;

    tracing::debug!(
        from_user = %from_user,
        to_user = %to_user,
        size_bytes = envelope.size,
        "Sealed file envelope"
    );

    Ok(envelope)
}

/// Open an envelope addressed to the holder of `recipient_key`.
///
/// `sender_key` must be the sender's currently published key, looked up at
/// open time.
pub fn open_file(
    envelope: &FileEnvelope,
    recipient_key: &PrivateKey,
    sender_key: &PublicKey,
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    envelope.validate()?;

    let file_key = unwrap_key(&envelope.wrapped_key, recipient_key)?;

    if !sign::verify(&envelope.ciphertext, &envelope.signature, sender_key) {
        tracing::warn!(
            from_user = %envelope.from_user,
            to_user = %envelope.to_user,
            "Envelope signature rejected"
        );
        return Err(CryptoError::SignatureInvalid);
    }

    let plaintext = cipher::decrypt(
        file_key.as_bytes(),
        &envelope.iv,
        &envelope.ciphertext,
        &envelope.auth_tag,
    )?;

    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_keys::{alice, bob, carol};

    fn user(name: &str) -> UserId {
        UserId::new(name).unwrap()
    }

    fn sealed_for_bob(plaintext: &[u8]) -> FileEnvelope {
        seal_file(
            "report.pdf",
            plaintext,
            &user("alice"),
            &alice().private,
            &user("bob"),
            &bob().public,
        )
        .unwrap()
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let envelope = sealed_for_bob(b"quarterly numbers");
        let plaintext = open_file(&envelope, &bob().private, &alice().public).unwrap();

        assert_eq!(plaintext.as_slice(), b"quarterly numbers");
        assert_eq!(envelope.size, 17);
        assert_eq!(envelope.name, "report.pdf");
        assert_eq!(envelope.from_user, user("alice"));
        assert_eq!(envelope.to_user, user("bob"));
    }

    #[test]
    fn test_seal_open_empty_file() {
        let envelope = sealed_for_bob(b"");
        let plaintext = open_file(&envelope, &bob().private, &alice().public).unwrap();
        assert!(plaintext.is_empty());
    }

    #[test]
    fn test_wrong_recipient_key() {
        let envelope = sealed_for_bob(b"for bob only");
        let result = open_file(&envelope, &carol().private, &alice().public);
        assert!(matches!(result, Err(CryptoError::UnwrapFailure)));
    }

    #[test]
    fn test_wrong_sender_key() {
        let envelope = sealed_for_bob(b"from alice");
        let result = open_file(&envelope, &bob().private, &carol().public);
        assert!(matches!(result, Err(CryptoError::SignatureInvalid)));
    }

    #[test]
    fn test_flipped_ciphertext_bit_rejected_by_signature() {
        let mut envelope = sealed_for_bob(b"do not alter");
        envelope.ciphertext[3] ^= 0x10;

        let result = open_file(&envelope, &bob().private, &alice().public);
        assert!(matches!(result, Err(CryptoError::SignatureInvalid)));
    }

    #[test]
    fn test_flipped_tag_bit() {
        let mut envelope = sealed_for_bob(b"do not alter");
        envelope.auth_tag[0] ^= 0x01;

        let result = open_file(&envelope, &bob().private, &alice().public);
        assert!(matches!(result, Err(CryptoError::AuthenticationFailure)));
    }

    #[test]
    fn test_flipped_wrapped_key_bit() {
        let mut envelope = sealed_for_bob(b"do not alter");
        envelope.wrapped_key[100] ^= 0x02;

        let result = open_file(&envelope, &bob().private, &alice().public);
        assert!(matches!(result, Err(CryptoError::UnwrapFailure)));
    }

    #[test]
    fn test_flipped_iv_bit() {
        let mut envelope = sealed_for_bob(b"do not alter");
        envelope.iv[11] ^= 0x40;

        let result = open_file(&envelope, &bob().private, &alice().public);
        assert!(matches!(result, Err(CryptoError::AuthenticationFailure)));
    }

    #[test]
    fn test_resigned_ciphertext_still_needs_valid_tag() {
        // A sender key holder who alters ciphertext and re-signs still
        // cannot get past the GCM tag.
        let mut envelope = sealed_for_bob(b"do not alter");
        envelope.ciphertext[0] ^= 0xff;
        envelope.signature = sign::sign(&envelope.ciphertext, &alice().private).unwrap();

        let result = open_file(&envelope, &bob().private, &alice().public);
        assert!(matches!(result, Err(CryptoError::AuthenticationFailure)));
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let mut envelope = sealed_for_bob(b"twelve bytes");
        envelope.size = 11;

        let result = open_file(&envelope, &bob().private, &alice().public);
        assert!(matches!(result, Err(CryptoError::InvalidEnvelope(_))));
    }

    #[test]
    fn test_iv_fresh_per_seal() {
        let a = sealed_for_bob(b"same");
        let b = sealed_for_bob(b"same");

        assert_ne!(a.iv, b.iv);
        assert_ne!(a.wrapped_key, b.wrapped_key);
    }

    #[test]
    fn test_json_wire_form() {
        let envelope = sealed_for_bob(b"wire");
        let json = envelope.to_json().unwrap();

        for field in [
            "\"name\"",
            "\"size\":4",
            "\"ciphertext\"",
            "\"iv\"",
            "\"authTag\"",
            "\"wrappedKey\"",
            "\"signature\"",
            "\"fromUser\":\"alice\"",
            "\"toUser\":\"bob\"",
        ] {
            assert!(json.contains(field), "missing {}", field);
        }

        let parsed = FileEnvelope::from_json(&json).unwrap();
        assert_eq!(envelope, parsed);
    }

    #[test]
    fn test_from_json_rejects_bad_tag_length() {
        let envelope = sealed_for_bob(b"wire");
        let mut value: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
        value["authTag"] = serde_json::Value::String(crate::format::base64_encode(&[0u8; 12]));

        let result = FileEnvelope::from_json(&value.to_string());
        assert!(matches!(result, Err(CryptoError::InvalidEnvelope(_))));
    }

    #[test]
    fn test_from_parts_validates() {
        let envelope = sealed_for_bob(b"parts");
        let parts = FileEnvelopeParts {
            name: envelope.name.clone(),
            size: envelope.size,
            ciphertext: envelope.ciphertext.clone(),
            iv: &envelope.iv[..8],
            auth_tag: &envelope.auth_tag,
            wrapped_key: envelope.wrapped_key.clone(),
            signature: envelope.signature.clone(),
            from_user: envelope.from_user.clone(),
            to_user: envelope.to_user.clone(),
        };
        assert!(matches!(
            FileEnvelope::from_parts(parts),
            Err(CryptoError::InvalidEnvelope(_))
        ));

        let parts = FileEnvelopeParts {
            name: String::new(),
            size: envelope.size,
            ciphertext: envelope.ciphertext.clone(),
            iv: &envelope.iv,
            auth_tag: &envelope.auth_tag,
            wrapped_key: envelope.wrapped_key.clone(),
            signature: envelope.signature.clone(),
            from_user: envelope.from_user.clone(),
            to_user: envelope.to_user.clone(),
        };
        assert!(FileEnvelope::from_parts(parts).is_err());
    }

    #[test]
    fn test_debug_omits_bytes() {
        let envelope = sealed_for_bob(b"secret");
        let debug = format!("{:?}", envelope);
        assert!(debug.contains("ciphertext_len"));
        assert!(!debug.contains("wrapped_key:"));
    }
}
