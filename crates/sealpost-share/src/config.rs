//! Configuration for the share workflow and the HTTP directory client.
//!
//! Both configs have sensible defaults and a `from_env()` constructor.
//!
//! | Variable | Default | Used by |
//! |----------|---------|---------|
//! | `SEALPOST_URL` | `http://localhost:3000` | [`HttpDirectoryConfig`] |
//! | `SEALPOST_TOKEN` | unset | [`HttpDirectoryConfig`] |
//! | `SEALPOST_TIMEOUT` | `30` (seconds) | both |
//! | `SEALPOST_RSA_BITS` | `4096` | [`ShareConfig`] |
//! | `SEALPOST_KDF_ITERATIONS` | `210000` | [`ShareConfig`] |

use std::time::Duration;

use sealpost_crypto::kdf::DEFAULT_ITERATIONS;
use sealpost_crypto::keys::{DEFAULT_MODULUS_BITS, MAX_MODULUS_BITS, MIN_MODULUS_BITS};
use sealpost_crypto::KdfParams;

use crate::error::{ShareError, ShareResult};

/// Default directory endpoint.
pub const DEFAULT_DIRECTORY_URL: &str = "http://localhost:3000";

/// Default timeout for one directory round trip, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for [`crate::HttpDirectory`].
#[derive(Debug, Clone)]
pub struct HttpDirectoryConfig {
    /// Base URL of the directory service.
    pub base_url: String,
    /// Bearer token attached to every request (optional).
    pub token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for HttpDirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DIRECTORY_URL.to_string(),
            token: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl HttpDirectoryConfig {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("SEALPOST_URL")
                .unwrap_or_else(|_| DEFAULT_DIRECTORY_URL.to_string()),
            token: std::env::var("SEALPOST_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            timeout_seconds: std::env::var("SEALPOST_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Settings for [`crate::ShareWorkflow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareConfig {
    /// Modulus size for newly generated key pairs.
    pub rsa_bits: usize,
    /// PBKDF2 parameters for sealing private keys.
    pub kdf: KdfParams,
    /// Upper bound on any single directory round trip.
    pub request_timeout: Duration,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            rsa_bits: DEFAULT_MODULUS_BITS,
            kdf: KdfParams::default(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ShareConfig {
    /// Load from environment variables.
    ///
    /// Unset variables take their defaults; set but invalid values are a
    /// configuration error rather than being silently replaced.
    pub fn from_env() -> ShareResult<Self> {
        let rsa_bits = parse_var("SEALPOST_RSA_BITS", DEFAULT_MODULUS_BITS)?;
        let iterations = parse_var("SEALPOST_KDF_ITERATIONS", DEFAULT_ITERATIONS)?;
        let timeout_secs = parse_var("SEALPOST_TIMEOUT", DEFAULT_TIMEOUT_SECS)?;

        let config = Self {
            rsa_bits,
            kdf: KdfParams { iterations },
            request_timeout: Duration::from_secs(timeout_secs),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that every setting is within its accepted range.
    pub fn validate(&self) -> ShareResult<()> {
        if !(MIN_MODULUS_BITS..=MAX_MODULUS_BITS).contains(&self.rsa_bits) || self.rsa_bits % 8 != 0
        {
            return Err(ShareError::Config(format!(
                "RSA modulus must be a multiple of 8 between {} and {} bits, got {}",
                MIN_MODULUS_BITS, MAX_MODULUS_BITS, self.rsa_bits
            )));
        }
        self.kdf
            .validate()
            .map_err(|e| ShareError::Config(e.to_string()))?;
        if self.request_timeout.is_zero() {
            return Err(ShareError::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> ShareResult<T> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ShareError::Config(format!("{} has invalid value '{}'", name, value))),
        Err(_) => Ok(default),
    }
}
