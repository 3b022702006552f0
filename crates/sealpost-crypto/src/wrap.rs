//! RSA-OAEP wrapping of per-file symmetric keys.

use rsa::Oaep;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::cipher::{SymmetricKey, SYMMETRIC_KEY_LEN};
use crate::error::{CryptoError, CryptoResult};
use crate::keys::{PrivateKey, PublicKey};

fn padding() -> Oaep {
    Oaep::new::<Sha256>()
}

/// Wrap a file key under the recipient's public key.
///
/// Output length always equals the recipient's modulus size.
pub fn wrap_key(key: &SymmetricKey, recipient: &PublicKey) -> CryptoResult<Vec<u8>> {
    recipient
        .as_rsa()
        .encrypt(&mut rand::thread_rng(), padding(), key.as_bytes())
        .map_err(|e| CryptoError::Encryption(format!("OAEP wrap failed: {}", e)))
}

/// Unwrap a file key with the recipient's private key.
///
/// Decryption is blinded. Wrong key, malformed input and a payload of the
/// wrong length all surface as the same [`CryptoError::UnwrapFailure`].
pub fn unwrap_key(wrapped: &[u8], recipient: &PrivateKey) -> CryptoResult<SymmetricKey> {
    let bytes = Zeroizing::new(
        recipient
            .as_rsa()
            .decrypt_blinded(&mut rand::thread_rng(), padding(), wrapped)
            .map_err(|_| CryptoError::UnwrapFailure)?,
    );

    if bytes.len() != SYMMETRIC_KEY_LEN {
        return Err(CryptoError::UnwrapFailure);
    }

    let mut key = Zeroizing::new([0u8; SYMMETRIC_KEY_LEN]);
    key.copy_from_slice(&bytes);
    Ok(SymmetricKey::from_bytes(*key))
}
