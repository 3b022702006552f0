//! Integration tests for private key and file envelopes.
//!
//! This test suite validates:
//! - Round trips for both envelope kinds
//! - Tamper detection for every security-relevant field
//! - Recipient and sender binding
//! - Error indistinguishability for the private key envelope
//! - Wire format stability

mod helpers;

use helpers::{alice, bob, mallory};
use sealpost_crypto::kdf::MIN_ITERATIONS;
use sealpost_crypto::{
    base64_decode, open_file, open_private_key, seal_file, seal_private_key, CryptoError,
    FileEnvelope, KdfParams, PrivateKeyEnvelope,
};

fn fast() -> KdfParams {
    KdfParams::with_iterations(MIN_ITERATIONS).unwrap()
}

fn alice_to_bob(plaintext: &[u8]) -> FileEnvelope {
    seal_file(
        "contract.txt",
        plaintext,
        &alice().user,
        &alice().keys.private,
        &bob().user,
        &bob().keys.public,
    )
    .unwrap()
}

// ============================================================================
// Private key envelope
// ============================================================================

#[test]
fn test_private_key_envelope_eight_byte_scenario() {
    let secret = [1u8, 2, 3, 4, 5, 6, 7, 8];
    let envelope = PrivateKeyEnvelope::seal(&secret, "Password123!").unwrap();

    let opened = envelope.open("Password123!").unwrap();
    assert_eq!(opened.as_slice(), &secret);

    let result = envelope.open("WrongPassword!");
    assert!(matches!(
        result,
        Err(CryptoError::WrongPasswordOrCorruptEnvelope)
    ));
}

#[test]
fn test_private_key_envelope_roundtrip_various_secrets() {
    let secrets: [&[u8]; 4] = [b"", b"x", b"mySuperSecretPrivateKey", &[0u8; 4096]];
    for secret in secrets {
        let envelope = PrivateKeyEnvelope::seal_with_params(secret, "strongPassword123", &fast()).unwrap();
        assert_eq!(envelope.open("strongPassword123").unwrap().as_slice(), secret);
    }
}

#[test]
fn test_private_key_envelope_every_tag_bit() {
    let envelope = PrivateKeyEnvelope::seal_with_params(b"pem bytes", "pw", &fast()).unwrap();

    for bit in 0..128 {
        let mut tampered = envelope.clone();
        tampered.auth_tag[bit / 8] ^= 1 << (bit % 8);
        assert!(matches!(
            tampered.open("pw"),
            Err(CryptoError::WrongPasswordOrCorruptEnvelope)
        ));
    }
}

#[test]
fn test_wrong_password_indistinguishable_from_corruption() {
    let envelope = PrivateKeyEnvelope::seal_with_params(b"pem bytes", "right", &fast()).unwrap();

    let mut corrupt = envelope.clone();
    corrupt.ciphertext[2] ^= 0x20;

    let a = envelope.open("wrong").unwrap_err();
    let b = corrupt.open("right").unwrap_err();

    assert_eq!(format!("{:?}", a), format!("{:?}", b));
    assert_eq!(a.to_string(), b.to_string());
}

#[test]
fn test_private_key_envelope_wraps_real_key() {
    let envelope = seal_private_key(&bob().keys.private, "bob-password", &fast()).unwrap();
    let json = envelope.to_json().unwrap();

    // Nothing of the PEM is visible
    assert!(!json.contains("PRIVATE KEY"));

    let parsed = PrivateKeyEnvelope::from_json(&json).unwrap();
    let key = open_private_key(&parsed, "bob-password").unwrap();
    assert_eq!(key.public_key(), bob().keys.public);
}

// ============================================================================
// File envelope
// ============================================================================

#[test]
fn test_file_envelope_roundtrip() {
    let file: Vec<u8> = (0..=255).cycle().take(10_000).map(|b: u32| b as u8).collect();
    let envelope = alice_to_bob(&file);

    let opened = open_file(&envelope, &bob().keys.private, &alice().keys.public).unwrap();
    assert_eq!(opened.as_slice(), file.as_slice());
}

#[test]
fn test_single_bit_flips_never_release_plaintext() {
    let envelope = alice_to_bob(b"an important file body");

    for byte in 0..envelope.ciphertext.len() {
        let mut tampered = envelope.clone();
        tampered.ciphertext[byte] ^= 0x01;
        let err = open_file(&tampered, &bob().keys.private, &alice().keys.public).unwrap_err();
        assert!(err.is_protocol_failure(), "ciphertext byte {}: {}", byte, err);
    }

    for byte in 0..envelope.auth_tag.len() {
        let mut tampered = envelope.clone();
        tampered.auth_tag[byte] ^= 0x80;
        let err = open_file(&tampered, &bob().keys.private, &alice().keys.public).unwrap_err();
        assert!(matches!(err, CryptoError::AuthenticationFailure));
    }

    for byte in (0..envelope.wrapped_key.len()).step_by(31) {
        let mut tampered = envelope.clone();
        tampered.wrapped_key[byte] ^= 0x04;
        let err = open_file(&tampered, &bob().keys.private, &alice().keys.public).unwrap_err();
        assert!(matches!(err, CryptoError::UnwrapFailure));
    }
}

#[test]
fn test_wrong_recipient_fails_with_unwrap_failure() {
    let envelope = alice_to_bob(b"for bob");
    let result = open_file(&envelope, &mallory().keys.private, &alice().keys.public);
    assert!(matches!(result, Err(CryptoError::UnwrapFailure)));
}

#[test]
fn test_wrong_sender_fails_with_signature_invalid() {
    let envelope = alice_to_bob(b"for bob");
    let result = open_file(&envelope, &bob().keys.private, &mallory().keys.public);
    assert!(matches!(result, Err(CryptoError::SignatureInvalid)));
}

#[test]
fn test_two_senders_verify_only_against_their_own_key() {
    let from_alice = alice_to_bob(b"hello from alice");
    let from_mallory = seal_file(
        "note.txt",
        b"hello from mallory",
        &mallory().user,
        &mallory().keys.private,
        &bob().user,
        &bob().keys.public,
    )
    .unwrap();

    assert!(open_file(&from_alice, &bob().keys.private, &alice().keys.public).is_ok());
    assert!(open_file(&from_mallory, &bob().keys.private, &mallory().keys.public).is_ok());

    assert!(matches!(
        open_file(&from_alice, &bob().keys.private, &mallory().keys.public),
        Err(CryptoError::SignatureInvalid)
    ));
    assert!(matches!(
        open_file(&from_mallory, &bob().keys.private, &alice().keys.public),
        Err(CryptoError::SignatureInvalid)
    ));
}

#[test]
fn test_impersonation_by_relabelling_sender_fails() {
    // Mallory seals to bob but claims to be alice.
    let forged = seal_file(
        "invoice.pdf",
        b"pay mallory",
        &alice().user,
        &mallory().keys.private,
        &bob().user,
        &bob().keys.public,
    )
    .unwrap();

    let result = open_file(&forged, &bob().keys.private, &alice().keys.public);
    assert!(matches!(result, Err(CryptoError::SignatureInvalid)));
}

#[test]
fn test_nonce_freshness_across_seals() {
    let a = alice_to_bob(b"identical");
    let b = alice_to_bob(b"identical");
    assert_ne!(a.iv, b.iv);
    assert_ne!(a.ciphertext, b.ciphertext);
}

#[test]
fn test_wire_fields_are_base64() {
    let envelope = alice_to_bob(b"wire check");
    let value: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();

    assert_eq!(base64_decode(value["iv"].as_str().unwrap()).unwrap().len(), 12);
    assert_eq!(base64_decode(value["authTag"].as_str().unwrap()).unwrap().len(), 16);
    assert_eq!(
        base64_decode(value["wrappedKey"].as_str().unwrap()).unwrap(),
        envelope.wrapped_key
    );
    assert_eq!(value["size"].as_u64(), Some(10));
    assert_eq!(value["fromUser"].as_str(), Some("alice"));
    assert_eq!(value["toUser"].as_str(), Some("bob"));
}
