//! Wire encoding helpers.
//!
//! Every binary field crosses the network or storage boundary as standard
//! (padded) base64 text. The serde helpers here are used with
//! `#[serde(with = "...")]` on envelope fields so that length checks happen
//! while parsing, not deep inside decryption.

use base64::Engine;

use crate::error::{CryptoError, CryptoResult};

/// Encode bytes as base64.
pub fn base64_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Decode base64 string to bytes.
pub fn base64_decode(data: &str) -> CryptoResult<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| CryptoError::InvalidEnvelope(format!("Invalid base64: {}", e)))
}

/// Copy a slice into a fixed-size array, naming the field on failure.
pub fn to_array<const N: usize>(field: &str, bytes: &[u8]) -> CryptoResult<[u8; N]> {
    bytes.try_into().map_err(|_| {
        CryptoError::InvalidEnvelope(format!(
            "{} must be {} bytes, got {}",
            field,
            N,
            bytes.len()
        ))
    })
}

/// Serde helper for base64-encoded fixed-size byte arrays.
pub(crate) mod base64_array {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S, const N: usize>(bytes: &[u8; N], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        serializer.serialize_str(&encoded)
    }

    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&s)
            .map_err(serde::de::Error::custom)?;
        if bytes.len() != N {
            return Err(serde::de::Error::custom(format!(
                "Expected {} bytes, got {}",
                N,
                bytes.len()
            )));
        }
        let mut arr = [0u8; N];
        arr.copy_from_slice(&bytes);
        Ok(arr)
    }
}

/// Serde helper for base64-encoded Vec<u8>.
pub(crate) mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        serializer.serialize_str(&encoded)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(&s)
            .map_err(serde::de::Error::custom)
    }
}
