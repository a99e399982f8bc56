//! Shared types and utilities for rusty-sitepush.
//!
//! This crate provides common functionality used across all rusty-sitepush crates:
//! - `FileCandidate`, the local input to an upload run
//! - Site path normalization (POSIX, no leading slash)
//! - Content type detection from file extensions
//! - Content digests for plan fingerprints
//! - Generic progress callback trait
//! - Shared constants and error types

pub mod candidate;
pub mod constants;
pub mod content_type;
pub mod error;
pub mod hash;
pub mod path_utils;
pub mod progress;

// Re-export commonly used items at crate root
pub use candidate::FileCandidate;
pub use constants::*;
pub use content_type::guess_content_type;
pub use error::PathError;
pub use hash::DigestBuilder;
pub use path_utils::{join_site_path, lexical_normalize, normalize_site_path, to_posix_path};
pub use progress::ProgressCallback;
