//! Local key storage.
//!
//! Each user gets two files under the profile home:
//! `<user>.key.json` (sealed private key) and `<user>.pub.pem`.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use sealpost_crypto::{load_public_key, save_public_key, PrivateKeyEnvelope, PublicKey, UserId};

pub struct Profile {
    home: PathBuf,
}

impl Profile {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn envelope_path(&self, user: &UserId) -> PathBuf {
        self.home.join(format!("{}.key.json", user))
    }

    pub fn public_key_path(&self, user: &UserId) -> PathBuf {
        self.home.join(format!("{}.pub.pem", user))
    }

    /// Store a user's keys, refusing to replace existing ones.
    pub fn save(
        &self,
        user: &UserId,
        envelope: &PrivateKeyEnvelope,
        public: &PublicKey,
    ) -> Result<()> {
        std::fs::create_dir_all(&self.home)
            .with_context(|| format!("creating {}", self.home.display()))?;

        let envelope_path = self.envelope_path(user);
        if envelope_path.exists() {
            bail!(
                "keys for {} already exist at {}",
                user,
                envelope_path.display()
            );
        }

        std::fs::write(&envelope_path, envelope.to_json()?)
            .with_context(|| format!("writing {}", envelope_path.display()))?;
        save_public_key(public, &self.public_key_path(user))?;
        Ok(())
    }

    pub fn load_envelope(&self, user: &UserId) -> Result<PrivateKeyEnvelope> {
        let path = self.envelope_path(user);
        let json = std::fs::read_to_string(&path).with_context(|| {
            format!(
                "no local key for {} at {} (run `sealpost register` or `sealpost login` first)",
                user,
                path.display()
            )
        })?;
        Ok(PrivateKeyEnvelope::from_json(&json)?)
    }

    pub fn load_public_key(&self, user: &UserId) -> Result<PublicKey> {
        let path = self.public_key_path(user);
        load_public_key(&path).with_context(|| format!("reading {}", path.display()))
    }
}

/// Final path component of a sender-chosen file name.
///
/// Rejects names that would escape the output directory.
pub fn safe_file_name(name: &str) -> Result<&str> {
    let file_name = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "." && *n != "..");

    match file_name {
        Some(n) if n == name => Ok(n),
        _ => bail!("refusing unsafe file name {:?}", name),
    }
}
