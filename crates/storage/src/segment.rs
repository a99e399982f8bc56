//! Segment layout utilities.
//!
//! This module contains pure logic for splitting an encoded file into
//! segments that respect the storage alignment and per-call limits.
//! No I/O operations - just decision making.

use rusty_sitepush_common::{MAX_BATCH_BYTES, STORAGE_UNIT};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// A contiguous byte range of one file's encoded data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Byte offset within the encoded data.
    pub offset: u64,
    /// Length of this segment in bytes.
    pub length: u64,
}

impl Segment {
    /// Create a segment.
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// Offset one past the last byte.
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }

    /// Borrow this segment's bytes out of the file's encoded data.
    ///
    /// # Panics
    /// Panics if the segment lies outside `data`; segments are only ever
    /// produced from the same data they slice.
    pub fn slice<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.offset as usize..self.end() as usize]
    }
}

/// Size constraints imposed by the storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchLimits {
    storage_unit: u64,
    units_per_batch: u64,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            storage_unit: STORAGE_UNIT,
            units_per_batch: MAX_BATCH_BYTES / STORAGE_UNIT,
        }
    }
}

impl BatchLimits {
    /// Create limits from a storage unit and the units allowed per call.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if either value is zero.
    pub fn new(storage_unit: u64, units_per_batch: u64) -> Result<Self, StorageError> {
        if storage_unit == 0 {
            return Err(StorageError::InvalidConfig {
                message: "storage unit must be at least one byte".into(),
            });
        }
        if units_per_batch == 0 {
            return Err(StorageError::InvalidConfig {
                message: "a batch must hold at least one storage unit".into(),
            });
        }
        if storage_unit.checked_mul(units_per_batch).is_none() {
            return Err(StorageError::InvalidConfig {
                message: "batch size overflows".into(),
            });
        }
        Ok(Self {
            storage_unit,
            units_per_batch,
        })
    }

    /// Alignment that every non-final segment must honor.
    pub fn storage_unit(&self) -> u64 {
        self.storage_unit
    }

    /// Storage units allowed per write call.
    pub fn units_per_batch(&self) -> u64 {
        self.units_per_batch
    }

    /// Maximum payload bytes in one write call.
    pub fn max_batch_bytes(&self) -> u64 {
        self.storage_unit * self.units_per_batch
    }

    /// Round down to a whole number of storage units.
    pub fn align_down(&self, bytes: u64) -> u64 {
        (bytes / self.storage_unit) * self.storage_unit
    }
}

/// Lay out all segments of a file given the length of its first segment.
///
/// The first segment starts at offset 0. The rest of the file is cut into
/// slices of at most `max_batch_bytes`; since that is a whole number of
/// storage units, only the last slice can be unaligned.
///
/// # Arguments
/// * `encoded_size` - Total encoded size of the file
/// * `initial_length` - Length of the first segment (already aligned unless it
///   covers the whole file)
/// * `limits` - Backend size constraints
///
/// # Returns
/// Segments in order. An empty file yields one zero-length segment.
pub fn layout_segments(
    encoded_size: u64,
    initial_length: u64,
    limits: &BatchLimits,
) -> Vec<Segment> {
    let initial: u64 = initial_length.min(encoded_size);
    let mut segments: Vec<Segment> = vec![Segment::new(0, initial)];

    let mut offset: u64 = initial;
    while offset < encoded_size {
        let length: u64 = std::cmp::min(encoded_size - offset, limits.max_batch_bytes());
        segments.push(Segment::new(offset, length));
        offset += length;
    }

    segments
}

/// Check that segments tile `encoded_size` with only the last one unaligned.
pub fn is_valid_layout(segments: &[Segment], encoded_size: u64, limits: &BatchLimits) -> bool {
    let mut expected_offset: u64 = 0;
    for (index, segment) in segments.iter().enumerate() {
        if segment.offset != expected_offset {
            return false;
        }
        let is_last: bool = index + 1 == segments.len();
        if !is_last && segment.length % limits.storage_unit() != 0 {
            return false;
        }
        expected_offset = segment.end();
    }
    !segments.is_empty() && expected_offset == encoded_size
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> BatchLimits {
        BatchLimits::new(100, 3).unwrap()
    }

    #[test]
    fn test_default_limits() {
        let limits = BatchLimits::default();
        assert_eq!(limits.storage_unit(), 0x6000 - 1);
        assert_eq!(limits.max_batch_bytes(), 3 * (0x6000 - 1));
    }

    #[test]
    fn test_invalid_limits() {
        assert!(matches!(
            BatchLimits::new(0, 3),
            Err(StorageError::InvalidConfig { .. })
        ));
        assert!(matches!(
            BatchLimits::new(100, 0),
            Err(StorageError::InvalidConfig { .. })
        ));
        assert!(BatchLimits::new(u64::MAX, 2).is_err());
    }

    #[test]
    fn test_align_down() {
        assert_eq!(limits().align_down(0), 0);
        assert_eq!(limits().align_down(99), 0);
        assert_eq!(limits().align_down(100), 100);
        assert_eq!(limits().align_down(299), 200);
    }

    #[test]
    fn test_layout_whole_file() {
        let segments: Vec<Segment> = layout_segments(80, 80, &limits());
        assert_eq!(segments, vec![Segment::new(0, 80)]);
    }

    #[test]
    fn test_layout_with_remainder() {
        let segments: Vec<Segment> = layout_segments(250, 100, &limits());
        assert_eq!(segments, vec![Segment::new(0, 100), Segment::new(100, 150)]);
        assert!(is_valid_layout(&segments, 250, &limits()));
    }

    #[test]
    fn test_layout_large_file() {
        let segments: Vec<Segment> = layout_segments(1000, 300, &limits());
        assert_eq!(
            segments,
            vec![
                Segment::new(0, 300),
                Segment::new(300, 300),
                Segment::new(600, 300),
                Segment::new(900, 100),
            ]
        );
        assert!(is_valid_layout(&segments, 1000, &limits()));
    }

    #[test]
    fn test_layout_empty_file() {
        let segments: Vec<Segment> = layout_segments(0, 0, &limits());
        assert_eq!(segments, vec![Segment::new(0, 0)]);
        assert!(is_valid_layout(&segments, 0, &limits()));
    }

    #[test]
    fn test_invalid_layout_detected() {
        // Unaligned non-final segment
        let segments = vec![Segment::new(0, 150), Segment::new(150, 100)];
        assert!(!is_valid_layout(&segments, 250, &limits()));

        // Gap between segments
        let segments = vec![Segment::new(0, 100), Segment::new(150, 100)];
        assert!(!is_valid_layout(&segments, 250, &limits()));

        // Short of the total
        let segments = vec![Segment::new(0, 100)];
        assert!(!is_valid_layout(&segments, 250, &limits()));
    }

    #[test]
    fn test_segment_slice() {
        let data: Vec<u8> = (0u8..10).collect();
        assert_eq!(Segment::new(2, 3).slice(&data), &[2, 3, 4]);
        assert_eq!(Segment::new(10, 0).slice(&data), &[] as &[u8]);
    }
}
