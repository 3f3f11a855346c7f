//! Error types for access-relay.

/// Top-level error type for the relay.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Access token encoding/decoding errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Key must be {expected} bytes, got {actual}")]
    KeyLength { expected: usize, actual: usize },

    #[error("IV must be {expected} bytes, got {actual}")]
    IvLength { expected: usize, actual: usize },

    #[error("Cipher text is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Decryption failed (bad padding or block length)")]
    Decrypt,

    #[error("Decrypted payload is not UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Decrypted payload is not a token: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Outbound messaging errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send message on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Errors from the panel cloud API and the occupant directory.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("{service} request failed: {reason}")]
    RequestFailed { service: String, reason: String },

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {service}: {reason}")]
    InvalidResponse { service: String, reason: String },

    #[error("Authentication failed for {service}: {reason}")]
    AuthFailed { service: String, reason: String },
}

/// Result type alias for the relay.
pub type Result<T> = std::result::Result<T, Error>;
