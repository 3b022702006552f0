//! Subcommand implementations.
//!
//! Every command prints a JSON document on stdout; logs go to stderr.

use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use zeroize::Zeroizing;

use sealpost_crypto::{seal_private_key, KeyPair, PrivateKey, UserId};
use sealpost_share::{
    Account, FileId, HttpDirectory, HttpDirectoryConfig, Registration, ShareConfig, ShareWorkflow,
};

use crate::profile::{safe_file_name, Profile};
use crate::GlobalArgs;

/// Shortest password accepted when creating keys.
const MIN_PASSWORD_LEN: usize = 8;

fn share_config(global: &GlobalArgs) -> Result<ShareConfig> {
    let mut config = ShareConfig::from_env()?;
    if let Some(secs) = global.timeout {
        config.request_timeout = Duration::from_secs(secs);
    }
    config.validate()?;
    Ok(config)
}

fn workflow(global: &GlobalArgs) -> Result<ShareWorkflow> {
    let mut directory_config = HttpDirectoryConfig::from_env();
    if let Some(ref url) = global.url {
        directory_config.base_url = url.clone();
    }
    if let Some(ref token) = global.token {
        directory_config.token = Some(token.clone());
    }
    if let Some(secs) = global.timeout {
        directory_config.timeout_seconds = secs;
    }

    let directory = HttpDirectory::new(directory_config)?;
    Ok(ShareWorkflow::new(Arc::new(directory), share_config(global)?)?)
}

/// Password from `--password`/`SEALPOST_PASSWORD`, or prompted.
fn password(global: &GlobalArgs, new: bool) -> Result<Zeroizing<String>> {
    let password = match global.password {
        Some(ref p) => Zeroizing::new(p.clone()),
        None => {
            let first = Zeroizing::new(rpassword::prompt_password("Password: ")?);
            if new {
                let second = Zeroizing::new(rpassword::prompt_password("Confirm password: ")?);
                if *first != *second {
                    bail!("passwords do not match");
                }
            }
            first
        }
    };

    if new && password.chars().count() < MIN_PASSWORD_LEN {
        bail!("password must be at least {} characters", MIN_PASSWORD_LEN);
    }
    Ok(password)
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Generate a key pair and store it in the profile, sealed under `password`.
async fn create_local_keys(
    profile: &Profile,
    config: &ShareConfig,
    user: &UserId,
    password: &str,
) -> Result<KeyPair> {
    if profile.envelope_path(user).exists() {
        bail!("keys for {} already exist", user);
    }

    let (bits, kdf) = (config.rsa_bits, config.kdf);
    let password = Zeroizing::new(password.to_string());
    let (keys, envelope) = tokio::task::spawn_blocking(move || -> Result<_> {
        let keys = KeyPair::generate_with_bits(bits)?;
        let envelope = seal_private_key(&keys.private, &password, &kdf)?;
        Ok((keys, envelope))
    })
    .await??;

    profile.save(user, &envelope, &keys.public)?;
    info!(
        component = "cli",
        user = %user,
        key_fingerprint = %keys.public.fingerprint(),
        "Generated key pair"
    );
    Ok(keys)
}

/// Open the profile's sealed key and check it against the stored public key.
async fn open_local_keys(
    profile: &Profile,
    workflow: &ShareWorkflow,
    user: &UserId,
    password: &str,
) -> Result<PrivateKey> {
    let envelope = profile.load_envelope(user)?;
    let key = workflow
        .unlock(&envelope, password)
        .await
        .with_context(|| format!("unlocking private key for {}", user))?;

    // A swapped public key file would make us trust the wrong fingerprint
    let public = profile.load_public_key(user)?;
    if key.public_key() != public {
        bail!(
            "local public key for {} does not match its private key",
            user
        );
    }
    Ok(key)
}

/// Publish the profile's keys for a new account.
async fn publish_local_keys(
    profile: &Profile,
    workflow: &ShareWorkflow,
    user: &UserId,
    password: &str,
) -> Result<Registration> {
    let private = open_local_keys(profile, workflow, user, password).await?;
    let registration = workflow
        .register_with_keys(user.as_str(), password, KeyPair::from_private(private))
        .await?;
    Ok(registration)
}

/// Store the keys recovered at login unless the profile already has them.
///
/// Returns whether anything was written.
fn restore_profile(profile: &Profile, account: &Account) -> Result<bool> {
    if profile.envelope_path(&account.user).exists() {
        let local = profile.load_public_key(&account.user)?;
        if local != account.keys.public {
            bail!(
                "local keys for {} differ from the published ones (fingerprint {})",
                account.user,
                account.keys.public.fingerprint()
            );
        }
        return Ok(false);
    }

    profile.save(&account.user, &account.envelope, &account.keys.public)?;
    debug!(
        component = "cli",
        user = %account.user,
        path = %profile.envelope_path(&account.user).display(),
        "Restored local keys"
    );
    Ok(true)
}

async fn unlock_key(
    global: &GlobalArgs,
    workflow: &ShareWorkflow,
    user: &UserId,
) -> Result<PrivateKey> {
    let profile = Profile::new(&global.home);
    let password = password(global, false)?;
    open_local_keys(&profile, workflow, user, &password).await
}

pub async fn keygen(global: &GlobalArgs, user: &str) -> Result<()> {
    let user = UserId::new(user)?;
    let config = share_config(global)?;
    let profile = Profile::new(&global.home);
    if profile.envelope_path(&user).exists() {
        bail!("keys for {} already exist", user);
    }
    let password = password(global, true)?;

    let keys = create_local_keys(&profile, &config, &user, &password).await?;

    print_json(&serde_json::json!({
        "username": user.as_str(),
        "fingerprint": keys.public.fingerprint(),
        "modulus_bits": keys.public.modulus_bits(),
        "private_key_path": profile.envelope_path(&user).to_string_lossy(),
        "public_key_path": profile.public_key_path(&user).to_string_lossy(),
    }))
}

/// Register an account for the profile's keys, generating them first when
/// the profile has none.
///
/// Keys are saved locally before anything is published.
pub async fn register(global: &GlobalArgs, user: &str) -> Result<()> {
    let user = UserId::new(user)?;
    let profile = Profile::new(&global.home);
    let workflow = workflow(global)?;

    let existing = profile.envelope_path(&user).exists();
    let password = password(global, !existing)?;
    if !existing {
        create_local_keys(&profile, workflow.config(), &user, &password).await?;
    }

    let registration = publish_local_keys(&profile, &workflow, &user, &password).await?;

    print_json(&serde_json::json!({
        "id": registration.id,
        "username": registration.user.as_str(),
        "fingerprint": registration.keys.public.fingerprint(),
        "new_keys": !existing,
    }))
}

/// Log in and restore the account's keys into the local profile.
pub async fn login(global: &GlobalArgs, user: &str) -> Result<()> {
    let user = UserId::new(user)?;
    let workflow = workflow(global)?;
    let password = password(global, false)?;

    let account = workflow.login(user.as_str(), &password).await?;
    let saved = restore_profile(&Profile::new(&global.home), &account)?;

    print_json(&serde_json::json!({
        "id": account.id,
        "username": account.user.as_str(),
        "fingerprint": account.keys.public.fingerprint(),
        "saved": saved,
    }))
}

pub async fn unlock(global: &GlobalArgs, user: &str) -> Result<()> {
    let user = UserId::new(user)?;
    let workflow = workflow(global)?;
    let key = unlock_key(global, &workflow, &user).await?;

    print_json(&serde_json::json!({
        "username": user.as_str(),
        "fingerprint": key.public_key().fingerprint(),
        "unlocked": true,
    }))
}

pub async fn upload(
    global: &GlobalArgs,
    user: &str,
    to: &str,
    input: &Path,
    name: Option<&str>,
) -> Result<()> {
    let user = UserId::new(user)?;
    let to = UserId::new(to)?;
    let name = match name {
        Some(n) => n.to_string(),
        None => input
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .with_context(|| format!("{} has no usable file name", input.display()))?,
    };

    let contents = Zeroizing::new(
        std::fs::read(input).with_context(|| format!("reading {}", input.display()))?,
    );
    debug!(
        component = "cli",
        path = %input.display(),
        size_bytes = contents.len(),
        "Read input file"
    );

    let workflow = workflow(global)?;
    let key = unlock_key(global, &workflow, &user).await?;
    let id = workflow
        .upload(&user, &key, &to, &name, &contents)
        .await?;

    print_json(&serde_json::json!({
        "id": id.0,
        "name": name,
        "size": contents.len(),
        "to": to.as_str(),
    }))
}

pub async fn download(
    global: &GlobalArgs,
    user: &str,
    id: u64,
    output: &Path,
    force: bool,
) -> Result<()> {
    let user = UserId::new(user)?;
    let workflow = workflow(global)?;
    let key = unlock_key(global, &workflow, &user).await?;

    let opened = workflow.download(&user, &key, FileId(id)).await?;
    let path = output.join(safe_file_name(&opened.name)?);

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .create_new(!force)
        .open(&path)
        .with_context(|| format!("creating {} (use --force to replace)", path.display()))?;
    file.write_all(&opened.contents)?;

    print_json(&serde_json::json!({
        "id": opened.id.0,
        "from": opened.from_user.as_str(),
        "path": path.to_string_lossy(),
        "size": opened.contents.len(),
    }))
}

pub async fn shared(global: &GlobalArgs, user: &str) -> Result<()> {
    let user = UserId::new(user)?;
    let files = workflow(global)?.shared_with(&user).await?;
    print_json(&serde_json::to_value(&files)?)
}

pub async fn users(global: &GlobalArgs) -> Result<()> {
    let users = workflow(global)?.users().await?;
    let names: Vec<&str> = users.iter().map(UserId::as_str).collect();
    print_json(&serde_json::json!(names))
}
