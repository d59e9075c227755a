//! Error types shared across the workspace.

use thiserror::Error;

/// Result type alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the local persistent store.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to obtain a connection from the pool.
    #[error("Connection pool error: {0}")]
    Pool(String),

    /// A query or statement failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Anything else that went wrong inside the storage layer.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Errors raised by the remote catalog/object services.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The remote API answered with a non-success status.
    #[error("Remote API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The request never produced a usable response (timeout, DNS, TLS...).
    #[error("Remote transport error: {0}")]
    Transport(String),
}

impl RemoteError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// HTTP status if the remote answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(_) => None,
        }
    }
}

/// Top-level error for the sync core.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Sync error: {0}")]
    Sync(String),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn sync(message: impl Into<String>) -> Self {
        Self::Sync(message.into())
    }
}
