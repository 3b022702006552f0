//! RSASSA-PSS signatures over envelope ciphertext.

use rsa::pss::{BlindedSigningKey, Signature, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use sha2::Sha256;

use crate::error::{CryptoError, CryptoResult};
use crate::keys::{PrivateKey, PublicKey};

/// Sign `message` with the sender's private key.
pub fn sign(message: &[u8], private_key: &PrivateKey) -> CryptoResult<Vec<u8>> {
    let signing_key = BlindedSigningKey::<Sha256>::new(private_key.as_rsa().clone());
    let signature = signing_key
        .try_sign_with_rng(&mut rand::thread_rng(), message)
        .map_err(|e| CryptoError::Encryption(format!("Signing failed: {}", e)))?;
    Ok(signature.to_vec())
}

/// Verify `signature` over `message` under the sender's public key.
///
/// Pure; malformed signatures simply do not verify.
pub fn verify(message: &[u8], signature: &[u8], public_key: &PublicKey) -> bool {
    let signature = match Signature::try_from(signature) {
        Ok(signature) => signature,
        Err(_) => return false,
    };
    let verifying_key = VerifyingKey::<Sha256>::new(public_key.as_rsa().clone());
    verifying_key.verify(message, &signature).is_ok()
}
