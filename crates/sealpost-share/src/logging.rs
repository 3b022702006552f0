//! Structured logging field names for sealpost.
//!
//! Every field key passed to `info!`/`debug!`/`warn!`/`trace!` in the
//! sealpost crates is listed here, so log aggregation can query the same
//! keys across the workflow, the directory clients and the CLI.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Directory unreachable after configuration succeeded |
//! | WARN  | Security failure (bad signature, tampering, misaddressed file) |
//! | INFO  | Completed workflow operations (register, login, upload, download) |
//! | DEBUG | Directory round trips, key generation timing |
//! | TRACE | Request URLs |
//!
//! Passwords, key material and file contents are never logged. Usernames,
//! file names, sizes and key fingerprints are.

// ─── Identity fields ───────────────────────────────────────────────────────

/// Component emitting the event.
/// Values: "workflow", "http_directory", "memory_directory", "cli"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "register", "login", "upload", "download", "public_key"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Username performing the operation.
pub const USER: &str = "user";

/// Directory-assigned user id.
pub const USER_ID: &str = "user_id";

/// Sender of a file envelope.
pub const FROM_USER: &str = "from_user";

/// Recipient of a file envelope.
pub const TO_USER: &str = "to_user";

/// Directory-assigned file id.
pub const FILE_ID: &str = "file_id";

/// File name as given by the sender.
pub const FILE_NAME: &str = "file_name";

/// Local filesystem path read or written by the CLI.
pub const PATH: &str = "path";

/// Public key fingerprint.
pub const KEY_FINGERPRINT: &str = "key_fingerprint";

// ─── Directory fields ──────────────────────────────────────────────────────

/// Request URL.
pub const URL: &str = "url";

/// Whether requests carry a bearer token.
pub const AUTHENTICATED: &str = "authenticated";

/// HTTP status code returned by the directory.
pub const STATUS: &str = "status";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Whether a directory round trip succeeded.
pub const SUCCESS: &str = "success";

/// Error message attached to a failure.
pub const ERROR: &str = "error";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Plaintext size in bytes.
pub const SIZE_BYTES: &str = "size_bytes";

/// Number of entries returned by a listing.
pub const RESULT_COUNT: &str = "result_count";

/// RSA modulus size of a generated key.
pub const MODULUS_BITS: &str = "modulus_bits";

/// PBKDF2 iteration count used to seal a private key.
pub const KDF_ITERATIONS: &str = "kdf_iterations";
