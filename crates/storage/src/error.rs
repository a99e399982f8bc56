//! Error types for storage operations.

use rusty_sitepush_common::PathError;
use thiserror::Error;

/// Errors that can occur while reading from or writing to site storage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// File not present in the target version.
    #[error("File not found: {path}")]
    NotFound { path: String },

    /// A segment continuation could not be followed (e.g. the file is incomplete).
    #[error("Cannot resolve continuation {token} of {path}: {message}")]
    ContinuationUnresolved {
        path: String,
        token: u64,
        message: String,
    },

    /// Remote data length disagrees with its declared size.
    #[error("Size mismatch for {path}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },

    /// Dry-run rejected the operation (target version locked, stale state).
    #[error("Precondition failed: {message}")]
    Precondition { message: String },

    /// Submitting the operation failed.
    #[error("Submission failed: {message}")]
    Submission { message: String },

    /// The operation was submitted but not confirmed as applied.
    #[error("Confirmation failed for {handle}: {message}")]
    Confirmation { handle: String, message: String },

    /// No confirmation arrived in time.
    #[error("Timed out after {seconds}s waiting for confirmation of {handle}")]
    ConfirmationTimeout { handle: String, seconds: u64 },

    /// Network error.
    #[error("Network error: {message}")]
    NetworkError { message: String, retryable: bool },

    /// Content encoding failed.
    #[error("Compression error for {path}: {message}")]
    Compression { path: String, message: String },

    /// A candidate path is not a usable website path.
    #[error(transparent)]
    InvalidPath(#[from] PathError),

    /// Two candidates resolve to the same website path.
    #[error("Duplicate site path: {path}")]
    DuplicatePath { path: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl StorageError {
    /// Check if this error is retryable.
    ///
    /// Retrying always means a fresh planning run; this only says whether the
    /// failure is worth retrying at all.
    pub fn is_retryable(&self) -> bool {
        match self {
            StorageError::NetworkError { retryable, .. } => *retryable,
            StorageError::ConfirmationTimeout { .. } => true,
            StorageError::Submission { .. } => true,
            StorageError::NotFound { .. } => false,
            StorageError::ContinuationUnresolved { .. } => false,
            StorageError::SizeMismatch { .. } => false,
            StorageError::Precondition { .. } => false,
            StorageError::Confirmation { .. } => false,
            StorageError::Compression { .. } => false,
            StorageError::InvalidPath(_) => false,
            StorageError::DuplicatePath { .. } => false,
            StorageError::InvalidConfig { .. } => false,
            StorageError::Other { .. } => false,
        }
    }
}
