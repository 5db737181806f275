//! Error types for the remote store layer.
//!
//! These never cross the sync boundary raw: the sync engine catches them,
//! logs, and reports a [`crate::sync::SyncOutcome`] instead, so a failed
//! remote write can never roll back or poison local state.

use thiserror::Error;

/// Errors from a remote store implementation.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote store is not ready")]
    NotReady,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status: {0}")]
    Status(u16),

    #[error("malformed document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("invalid remote url: {0}")]
    InvalidUrl(String),
}

/// Result type for remote store operations.
pub type Result<T> = std::result::Result<T, RemoteError>;
