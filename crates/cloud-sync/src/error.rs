//! Error types for the cloud sync client.

use diecast_core::errors::{Error as CoreError, RemoteError};
use diecast_core::sync::{classify_http_status, SyncRetryClass};
use thiserror::Error;

/// Result type alias for cloud sync operations.
pub type Result<T> = std::result::Result<T, CloudSyncError>;

/// Errors that can occur while talking to the cloud service.
#[derive(Debug, Error)]
pub enum CloudSyncError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API error response from the cloud service
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid request (missing required data, etc.)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Authentication error (missing or invalid token)
    #[error("Authentication error: {0}")]
    Auth(String),
}

impl CloudSyncError {
    /// Create an API error from status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify error for retry policy.
    pub fn retry_class(&self) -> SyncRetryClass {
        match self {
            Self::Api { status, .. } => classify_http_status(*status),
            Self::Http(_) => SyncRetryClass::Retryable,
            Self::Json(_) => SyncRetryClass::Permanent,
            Self::InvalidRequest(_) => SyncRetryClass::Permanent,
            Self::Auth(_) => SyncRetryClass::ReauthRequired,
        }
    }
}

impl From<CloudSyncError> for CoreError {
    fn from(err: CloudSyncError) -> Self {
        match err {
            CloudSyncError::Http(e) => CoreError::Remote(RemoteError::transport(e.to_string())),
            CloudSyncError::Json(e) => CoreError::Serialization(e),
            CloudSyncError::Api { status, message } => {
                CoreError::Remote(RemoteError::api(status, message))
            }
            CloudSyncError::InvalidRequest(message) => CoreError::Validation(message),
            CloudSyncError::Auth(message) => {
                CoreError::Remote(RemoteError::api(401, message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_class_for_auth_error_is_reauth() {
        let err = CloudSyncError::api(401, "unauthorized");
        assert_eq!(err.retry_class(), SyncRetryClass::ReauthRequired);
    }

    #[test]
    fn retry_class_for_server_errors_is_retryable() {
        assert_eq!(
            CloudSyncError::api(503, "unavailable").retry_class(),
            SyncRetryClass::Retryable
        );
        assert_eq!(
            CloudSyncError::api(429, "slow down").retry_class(),
            SyncRetryClass::Retryable
        );
    }

    #[test]
    fn api_errors_keep_their_status_through_the_core_bridge() {
        let core: CoreError = CloudSyncError::api(503, "unavailable").into();
        match core {
            CoreError::Remote(RemoteError::Api { status, .. }) => assert_eq!(status, 503),
            other => panic!("unexpected error variant: {other:?}"),
        }
    }
}
