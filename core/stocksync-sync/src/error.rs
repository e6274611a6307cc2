//! Error types for the sync layer.

use crate::remote::DecodeError;
use stocksync_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network error (connection refused, DNS, TLS, reset).
    #[error("network error: {0}")]
    Network(String),

    /// The remote answered with a non-success status.
    #[error("remote returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Timeout.
    #[error("operation timed out")]
    Timeout,

    /// The remote payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Policy denied the operation.
    #[error("policy denied: {reason}")]
    PolicyDenied { reason: String },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The collection name cannot be used as an endpoint.
    #[error("invalid endpoint: {0:?}")]
    InvalidEndpoint(String),
}

impl SyncError {
    /// Returns true if the remote was unreachable or answered unusably.
    ///
    /// These failures are recovered locally by the sync strategies; everything
    /// else (storage, configuration) is a hard failure.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SyncError::Network(_)
                | SyncError::Status { .. }
                | SyncError::Timeout
                | SyncError::Decode(_)
        )
    }

    /// Returns true for a protected-collection refusal.
    pub fn is_policy_denied(&self) -> bool {
        matches!(self, SyncError::PolicyDenied { .. })
    }

    pub(crate) fn from_reqwest(err: reqwest::Error, context: &str) -> Self {
        if err.is_timeout() {
            SyncError::Timeout
        } else {
            SyncError::Network(format!("{context} failed: {err}"))
        }
    }
}
