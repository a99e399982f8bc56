//! In-memory backend for rusty-sitepush storage.
//!
//! This crate provides a `SiteStorage` implementation that keeps every website
//! version in process memory. It follows the rules of the on-chain store it
//! stands in for:
//!
//! - File data is append-only and kept in storage-unit sized chunks
//! - A batch may only create files; continuation data arrives via appends
//! - Versions can be locked, after which every write is rejected
//! - Writes land when confirmed, not when submitted
//!
//! Faults (rejected submissions, failed confirmations, failing reads) can be
//! injected to exercise error paths.
//!
//! # Example
//!
//! ```ignore
//! use rusty_sitepush_storage_memory::MemorySiteStorage;
//! use rusty_sitepush_storage::{SiteTarget, SiteUploader};
//!
//! let storage = MemorySiteStorage::new();
//! let uploader = SiteUploader::new(&storage, SiteTarget::new("0xsite", 0));
//! ```

mod store;

pub use store::{MemorySiteStorage, StoredFile};
