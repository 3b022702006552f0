//! sealpost: command-line client for one-to-one encrypted file sharing.
//!
//! Files are sealed for exactly one recipient with RSA-OAEP wrapped
//! AES-256-GCM keys and signed by the sender. The directory server only
//! ever sees envelopes and password-sealed private keys.

mod commands;
mod profile;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sealpost")]
#[command(author, version, about = "Encrypted one-to-one file sharing")]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Directory server URL
    #[arg(long, global = true, env = "SEALPOST_URL")]
    pub url: Option<String>,

    /// Bearer token for the directory server
    #[arg(long, global = true, env = "SEALPOST_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Where sealed private keys are kept
    #[arg(long, global = true, env = "SEALPOST_HOME", default_value = ".sealpost")]
    pub home: PathBuf,

    /// Account password (prompted for when absent)
    #[arg(long, global = true, env = "SEALPOST_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a key pair locally; `register` publishes it
    Keygen {
        /// Username the keys are for
        #[arg(short, long)]
        user: String,
    },

    /// Create an account for the local keys, generating them if needed
    Register {
        /// Username to register (3-20 letters, digits, underscores)
        #[arg(short, long)]
        user: String,
    },

    /// Log in and restore your keys into the local profile
    Login {
        #[arg(short, long)]
        user: String,
    },

    /// Check that the local private key opens with the password
    Unlock {
        #[arg(short, long)]
        user: String,
    },

    /// Encrypt a file for another user and upload it
    Upload {
        /// Sending user
        #[arg(short, long)]
        user: String,

        /// Recipient username
        #[arg(short, long)]
        to: String,

        /// File to send
        input: PathBuf,

        /// Name shown to the recipient (default: the input file name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Download, verify and decrypt a file shared with you
    Download {
        #[arg(short, long)]
        user: String,

        /// File id
        id: u64,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Replace an existing file of the same name
        #[arg(long)]
        force: bool,
    },

    /// List files shared with you
    Shared {
        #[arg(short, long)]
        user: String,
    },

    /// List registered users
    Users,
}

fn init_tracing() {
    // Logging is configured via environment variables:
    //   LOG_FORMAT - "json" or "text" (default: "text")
    //   RUST_LOG   - standard env filter (default: "sealpost=info,sealpost_share=info")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sealpost=info,sealpost_share=info,sealpost_crypto=warn".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // stdout carries command output; logs go to stderr
    if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let global = cli.global;
    match cli.command {
        Commands::Keygen { user } => commands::keygen(&global, &user).await,
        Commands::Register { user } => commands::register(&global, &user).await,
        Commands::Login { user } => commands::login(&global, &user).await,
        Commands::Unlock { user } => commands::unlock(&global, &user).await,
        Commands::Upload {
            user,
            to,
            input,
            name,
        } => commands::upload(&global, &user, &to, &input, name.as_deref()).await,
        Commands::Download {
            user,
            id,
            output,
            force,
        } => commands::download(&global, &user, id, &output, force).await,
        Commands::Shared { user } => commands::shared(&global, &user).await,
        Commands::Users => commands::users(&global).await,
    }
}
