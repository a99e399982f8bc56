//! Content digests.
//!
//! Digests identify byte content and plans across runs. They are not a
//! security boundary.

use xxhash_rust::xxh3::Xxh3;

/// Incremental digest over structured fields.
///
/// Variable-length fields are length-prefixed so that `("ab", "c")` and
/// `("a", "bc")` produce different digests.
pub struct DigestBuilder {
    inner: Xxh3,
}

impl DigestBuilder {
    /// Create an empty digest.
    pub fn new() -> Self {
        Self { inner: Xxh3::new() }
    }

    /// Add an integer field.
    pub fn update_u64(&mut self, value: u64) -> &mut Self {
        self.inner.update(&value.to_le_bytes());
        self
    }

    /// Add a string field.
    pub fn update_str(&mut self, value: &str) -> &mut Self {
        self.update_bytes(value.as_bytes())
    }

    /// Add a byte field.
    pub fn update_bytes(&mut self, value: &[u8]) -> &mut Self {
        self.update_u64(value.len() as u64);
        self.inner.update(value);
        self
    }

    /// Finalize and return the digest as 32-char hex string.
    pub fn finish_hex(&self) -> String {
        format!("{:032x}", self.inner.digest128())
    }
}

impl Default for DigestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
