//! Content encoding of files before upload.
//!
//! Gzip output is deterministic: the header carries no file name and a zero
//! modification time, so identical input always encodes to identical bytes.
//! That is what lets an unchanged file be recognized remotely and skipped.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::{Compression, GzBuilder};
use rusty_sitepush_common::FileCandidate;

use crate::error::StorageError;
use crate::types::{ContentEncoding, EncodedFile};

/// Applies the configured content encoding to upload candidates.
#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    encoding: ContentEncoding,
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(ContentEncoding::default())
    }
}

impl Compressor {
    /// Create a compressor for the given encoding.
    pub fn new(encoding: ContentEncoding) -> Self {
        Self { encoding }
    }

    /// Encoding this compressor applies.
    pub fn encoding(&self) -> ContentEncoding {
        self.encoding
    }

    /// Encode one candidate.
    ///
    /// # Errors
    /// Returns `Compression` if the encoder fails.
    pub fn encode(&self, candidate: FileCandidate) -> Result<EncodedFile, StorageError> {
        let original_size: u64 = candidate.size();

        let data: Vec<u8> = match self.encoding {
            ContentEncoding::None => candidate.raw_bytes,
            ContentEncoding::Gzip => gzip(&candidate.path, &candidate.raw_bytes)?,
        };

        log::debug!(
            "Encoded {} with {:?}: {} -> {} bytes",
            candidate.path,
            self.encoding,
            original_size,
            data.len()
        );

        Ok(EncodedFile {
            path: candidate.path,
            content_type: candidate.content_type,
            encoding: self.encoding,
            original_size,
            encoded_size: data.len() as u64,
            data,
        })
    }

    /// Encode every candidate, preserving order.
    ///
    /// # Errors
    /// Returns the first encoding failure; no partial list is returned.
    pub fn encode_all(
        &self,
        candidates: Vec<FileCandidate>,
    ) -> Result<Vec<EncodedFile>, StorageError> {
        candidates.into_iter().map(|c| self.encode(c)).collect()
    }
}

/// Restore the raw bytes of an encoded file.
///
/// # Errors
/// Returns `Compression` if the data is not valid for its encoding.
pub fn decode(file: &EncodedFile) -> Result<Vec<u8>, StorageError> {
    match file.encoding {
        ContentEncoding::None => Ok(file.data.clone()),
        ContentEncoding::Gzip => {
            let mut decoder = GzDecoder::new(file.data.as_slice());
            let mut raw: Vec<u8> = Vec::with_capacity(file.original_size as usize);
            decoder
                .read_to_end(&mut raw)
                .map_err(|e| compression_error(&file.path, e))?;
            Ok(raw)
        }
    }
}

fn gzip(path: &str, raw: &[u8]) -> Result<Vec<u8>, StorageError> {
    let mut encoder = GzBuilder::new()
        .mtime(0)
        .write(Vec::new(), Compression::default());
    encoder
        .write_all(raw)
        .map_err(|e| compression_error(path, e))?;
    encoder.finish().map_err(|e| compression_error(path, e))
}

fn compression_error(path: &str, err: std::io::Error) -> StorageError {
    StorageError::Compression {
        path: path.to_string(),
        message: err.to_string(),
    }
}
