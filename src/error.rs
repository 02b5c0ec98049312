//! Error types for the Portcullis service.

use thiserror::Error;

/// Main error type for Portcullis operations.
#[derive(Error, Debug)]
pub enum PortcullisError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Counter store errors
    #[error("Store error: {0}")]
    Store(#[from] redis::RedisError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Portcullis operations.
pub type Result<T> = std::result::Result<T, PortcullisError>;
