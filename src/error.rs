//! Error types for membergate.
//!
//! Errors stay in their domain enum: the gateway, the store, and config
//! loading each recover (or report) at their own call sites, so there
//! is no aggregate error type.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Messaging gateway errors.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Failed to send message to {recipient}: {reason}")]
    SendFailed { recipient: String, reason: String },

    #[error("Update polling failed: {0}")]
    PollFailed(String),

    #[error("Failed to acknowledge callback {callback_id}: {reason}")]
    AckFailed { callback_id: String, reason: String },

    #[error("Invalid update payload: {0}")]
    InvalidUpdate(String),
}

/// Contact store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to create record: {0}")]
    CreateFailed(String),

    #[error("Failed to list records: {0}")]
    ListFailed(String),

    #[error("HTTP error: {0}")]
    Http(String),
}
