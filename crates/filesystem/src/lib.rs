//! Local file collection for rusty-sitepush.
//!
//! This crate turns local files and directories into upload candidates:
//! - `CollectOptions` - Sources, website destination and filter
//! - `list_source_files()` - Source-to-website path mapping
//! - `collect_candidates()` - Read files and detect content types
//! - `GlobFilter` - Include/exclude pattern matching

pub mod collect;
pub mod error;
pub mod filter;

pub use collect::{collect_candidates, list_source_files, CollectOptions, SourceFile};
pub use error::FileSystemError;
pub use filter::GlobFilter;
