//! Usernames.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{CryptoError, CryptoResult};

/// Minimum username length.
pub const MIN_USERNAME_LEN: usize = 3;

/// Maximum username length.
pub const MAX_USERNAME_LEN: usize = 20;

/// A username: 3 to 20 ASCII letters, digits or underscores.
///
/// The directory binds each `UserId` to exactly one published public key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate and wrap a username.
    pub fn new(username: impl Into<String>) -> CryptoResult<Self> {
        let username = username.into();
        let len = username.chars().count();

        if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
            return Err(CryptoError::InvalidUserId(format!(
                "'{}' must be between {} and {} characters",
                username, MIN_USERNAME_LEN, MAX_USERNAME_LEN
            )));
        }
        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(CryptoError::InvalidUserId(format!(
                "'{}' may only contain letters, numbers, and underscores",
                username
            )));
        }

        Ok(Self(username))
    }

    /// The username as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for UserId {
    type Error = CryptoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
