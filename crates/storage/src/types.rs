//! Shared data structures for storage operations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Website and version that an upload run targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteTarget {
    /// Address or identifier of the website.
    pub website: String,
    /// Website version index.
    pub version: u64,
}

impl SiteTarget {
    /// Create a new target.
    pub fn new(website: impl Into<String>, version: u64) -> Self {
        Self {
            website: website.into(),
            version,
        }
    }
}

impl fmt::Display for SiteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@v{}", self.website, self.version)
    }
}

/// Content encoding applied to a file before it is stored.
///
/// The numeric ids are the values stored on-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ContentEncoding {
    /// Stored as-is.
    None,
    /// Gzip compressed.
    #[default]
    Gzip,
}

impl ContentEncoding {
    /// Wire identifier of this encoding.
    pub fn id(self) -> u8 {
        match self {
            ContentEncoding::None => 0,
            ContentEncoding::Gzip => 1,
        }
    }
}

/// A file after content encoding, ready for diffing and planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFile {
    /// Website path.
    pub path: String,
    /// Content type served for the file.
    pub content_type: String,
    /// Encoding applied to `data`.
    pub encoding: ContentEncoding,
    /// Size before encoding.
    pub original_size: u64,
    /// Size of `data`.
    pub encoded_size: u64,
    /// Encoded bytes, exactly what is stored remotely.
    pub data: Vec<u8>,
}

/// Opaque handle the storage backend uses to address a file's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentKey(pub String);

/// Remote view of one file at plan time.
///
/// Stale as soon as any write executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileMeta {
    /// Website path.
    pub path: String,
    /// Backend content handle.
    pub content_key: ContentKey,
    /// Total size announced when the file was created.
    pub declared_size: u64,
    /// Bytes actually written so far.
    pub written_size: u64,
    /// Whether all declared bytes have been written.
    pub complete: bool,
}

/// Position in a file's segment chain used by `read_segment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContinuationToken(pub u64);

impl ContinuationToken {
    /// Token for the first segment of a file.
    pub const START: ContinuationToken = ContinuationToken(0);
}

/// One read from a file's segment chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRead {
    /// Bytes of this segment.
    pub data: Vec<u8>,
    /// Where to continue, or `None` when the file is exhausted.
    pub next: Option<ContinuationToken>,
}

/// Handle of a submitted write, e.g. a transaction hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationHandle(pub String);

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Final status of a submitted write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// Included and applied.
    Confirmed,
    /// Included but reverted, or dropped.
    Failed { reason: String },
}
