//! Local file input to an upload run.

/// A local file to publish on the website.
///
/// Created once from local input and consumed by a single planning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    /// Website path, POSIX, no leading slash (e.g. "assets/logo.png").
    pub path: String,
    /// File contents as read from disk.
    pub raw_bytes: Vec<u8>,
    /// Content type served for this file (e.g. "text/html").
    pub content_type: String,
}

impl FileCandidate {
    /// Create a candidate.
    ///
    /// # Arguments
    /// * `path` - Website path
    /// * `raw_bytes` - File contents
    /// * `content_type` - Content type
    pub fn new(
        path: impl Into<String>,
        raw_bytes: impl Into<Vec<u8>>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            raw_bytes: raw_bytes.into(),
            content_type: content_type.into(),
        }
    }

    /// Size of the raw contents in bytes.
    pub fn size(&self) -> u64 {
        self.raw_bytes.len() as u64
    }
}
