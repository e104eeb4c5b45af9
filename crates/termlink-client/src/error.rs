//! Error types.
//!
//! Network conditions never surface through these: the manager models them
//! as connection state. They cover configuration, transport plumbing and
//! the async handle.

use thiserror::Error;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid value for `{field}`")]
    Invalid { field: &'static str },
}

/// Transport error.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("No async runtime available to drive the socket")]
    NoRuntime,
    #[error("Socket is not open")]
    NotOpen,
    #[error("Socket task has stopped")]
    ChannelClosed,
}

/// Error returned by `SessionHandle` calls.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Session driver has stopped")]
    DriverStopped,
    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}
