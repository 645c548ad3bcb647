//! Storage-specific error types.
//!
//! All store operations return [`StoreError`] on failure, which can be
//! matched to determine the underlying cause (database, timeout, bad row, etc.).

use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database operation failed (sqlx error).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The operation did not complete within its deadline.
    #[error("store operation timed out")]
    Timeout,

    /// Invalid data in database (e.g., unparsable timestamp).
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Internal error (e.g., directory creation failure).
    #[error("internal error: {0}")]
    Internal(String),
}
