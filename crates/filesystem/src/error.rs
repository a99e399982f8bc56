//! Error types for local file collection.

use rusty_sitepush_common::PathError;
use thiserror::Error;

/// Errors raised while turning local sources into upload candidates.
///
/// All of these are input errors: they abort the run before any planning.
#[derive(Debug, Error)]
pub enum FileSystemError {
    /// I/O error while reading a source.
    #[error("I/O error at {path}: {source}")]
    IoError {
        /// Path being accessed.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Source path does not exist or is not readable.
    #[error("Cannot access source {path}: {message}")]
    SourceUnavailable {
        /// The source path.
        path: String,
        /// Reason reported by the OS.
        message: String,
    },

    /// Source is neither a regular file nor a directory.
    #[error("Unsupported source {path}: not a file or directory")]
    UnsupportedSource {
        /// The source path.
        path: String,
    },

    /// Glob pattern failed to compile.
    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidGlobPattern {
        /// The pattern.
        pattern: String,
        /// Compiler message.
        reason: String,
    },

    /// Two local files map to the same website path.
    #[error("Website path {path} is produced by both {first} and {second}")]
    DuplicateDestination {
        /// Website path.
        path: String,
        /// First local file.
        first: String,
        /// Second local file.
        second: String,
    },

    /// Website path could not be built.
    #[error(transparent)]
    Path(#[from] PathError),
}

impl FileSystemError {
    /// Create an IoError for a path.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }
}
