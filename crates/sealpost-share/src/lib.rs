//! # sealpost-share
//!
//! Client-side share workflow for sealpost.
//!
//! [`ShareWorkflow`] drives the envelopes from `sealpost-crypto` against a
//! [`Directory`]: the untrusted service that stores public keys, sealed
//! private keys and file envelopes. Two directories are provided:
//!
//! - [`HttpDirectory`] talks to a directory service over HTTP (reqwest)
//! - [`MemoryDirectory`] keeps everything in process, for tests and demos
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sealpost_share::{HttpDirectory, ShareConfig, ShareWorkflow};
//!
//! # async fn run() -> sealpost_share::ShareResult<()> {
//! let directory = Arc::new(HttpDirectory::from_env()?);
//! let workflow = ShareWorkflow::new(directory, ShareConfig::from_env()?)?;
//!
//! let alice = workflow.register("alice", "correct horse").await?;
//! let bob: sealpost_crypto::UserId = "bob".parse()?;
//! let id = workflow
//!     .upload(&alice.user, &alice.keys.private, &bob, "plan.txt", b"Meet at noon")
//!     .await?;
//! println!("uploaded file {}", id);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod directory;
pub mod error;
pub mod http;
pub mod logging;
pub mod memory;
pub mod workflow;

pub use config::{HttpDirectoryConfig, ShareConfig};
pub use directory::{
    AccountRecord, Directory, FileId, LoginRequest, RegisterRequest, SharedFileSummary,
    UploadRequest, UserRecord,
};
pub use error::{ShareError, ShareResult};
pub use http::HttpDirectory;
pub use memory::MemoryDirectory;
pub use workflow::{Account, OpenedFile, Registration, ShareWorkflow};
