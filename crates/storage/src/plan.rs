//! Write operations and the ordered upload plan.

use rusty_sitepush_common::DigestBuilder;
use serde::Serialize;

use crate::segment::Segment;
use crate::types::ContentEncoding;

/// Create a file (or replace an existing one) with its first segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateOrReplace {
    /// Website path.
    pub path: String,
    /// Encoded size of the whole file.
    pub total_size: u64,
    /// Size before encoding.
    pub original_size: u64,
    /// Content type served for the file.
    pub content_type: String,
    /// Encoding of the stored bytes.
    pub encoding: ContentEncoding,
    /// Range of the encoded data carried here; always starts at offset 0.
    pub segment: Segment,
    /// Segment bytes.
    #[serde(skip)]
    pub data: Vec<u8>,
    /// Number of segments the file was split into.
    pub segment_count: usize,
    /// Whether a file already exists at this path remotely.
    pub replaces_existing: bool,
}

/// Append a continuation segment to a file created earlier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendSegment {
    /// Website path.
    pub path: String,
    /// Range of the encoded data carried here.
    pub segment: Segment,
    /// Segment bytes.
    #[serde(skip)]
    pub data: Vec<u8>,
    /// Zero-based index of this segment within the file.
    pub segment_index: usize,
    /// Number of segments the file was split into.
    pub segment_count: usize,
}

/// A single write operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOperation {
    /// First segment of a file.
    CreateOrReplace(CreateOrReplace),
    /// Continuation segment of a file.
    AppendSegment(AppendSegment),
}

impl WriteOperation {
    /// Website path written by this operation.
    pub fn path(&self) -> &str {
        match self {
            WriteOperation::CreateOrReplace(op) => &op.path,
            WriteOperation::AppendSegment(op) => &op.path,
        }
    }

    /// Segment carried by this operation.
    pub fn segment(&self) -> Segment {
        match self {
            WriteOperation::CreateOrReplace(op) => op.segment,
            WriteOperation::AppendSegment(op) => op.segment,
        }
    }

    /// Segment bytes.
    pub fn data(&self) -> &[u8] {
        match self {
            WriteOperation::CreateOrReplace(op) => &op.data,
            WriteOperation::AppendSegment(op) => &op.data,
        }
    }
}

/// The smallest thing submitted as one write call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteUnit {
    /// First segments of one or more distinct files.
    Batch(Vec<CreateOrReplace>),
    /// One continuation segment, alone.
    Append(AppendSegment),
}

impl WriteUnit {
    /// Payload bytes carried by this unit.
    pub fn payload_bytes(&self) -> u64 {
        match self {
            WriteUnit::Batch(ops) => ops.iter().map(|op| op.segment.length).sum(),
            WriteUnit::Append(op) => op.segment.length,
        }
    }

    /// Website paths touched by this unit, in order.
    pub fn paths(&self) -> Vec<&str> {
        match self {
            WriteUnit::Batch(ops) => ops.iter().map(|op| op.path.as_str()).collect(),
            WriteUnit::Append(op) => vec![op.path.as_str()],
        }
    }

    /// Flatten into individual operations.
    pub fn operations(&self) -> Vec<WriteOperation> {
        match self {
            WriteUnit::Batch(ops) => ops
                .iter()
                .cloned()
                .map(WriteOperation::CreateOrReplace)
                .collect(),
            WriteUnit::Append(op) => vec![WriteOperation::AppendSegment(op.clone())],
        }
    }

    /// Short human label, e.g. `batch[index.html, app.js]` or `append[app.js 2/3]`.
    pub fn describe(&self) -> String {
        match self {
            WriteUnit::Batch(ops) => format!(
                "batch[{}]",
                ops.iter().map(|op| op.path.as_str()).collect::<Vec<_>>().join(", ")
            ),
            WriteUnit::Append(op) => format!(
                "append[{} {}/{}]",
                op.path,
                op.segment_index + 1,
                op.segment_count
            ),
        }
    }
}

/// Ordered list of write units. Order must be preserved through execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Units in submission order.
    pub units: Vec<WriteUnit>,
}

impl Plan {
    /// Create a plan from units.
    pub fn new(units: Vec<WriteUnit>) -> Self {
        Self { units }
    }

    /// Whether there is nothing to submit.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Number of write calls.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Payload bytes across all units.
    pub fn total_bytes(&self) -> u64 {
        self.units.iter().map(WriteUnit::payload_bytes).sum()
    }

    /// Every operation for `path`, in emission order.
    pub fn operations_for(&self, path: &str) -> Vec<WriteOperation> {
        self.units
            .iter()
            .flat_map(WriteUnit::operations)
            .filter(|op| op.path() == path)
            .collect()
    }

    /// Digest of the full plan (unit boundaries, metadata and bytes).
    ///
    /// Two plans with the same fingerprint submit the same calls in the same
    /// order.
    pub fn fingerprint(&self) -> String {
        let mut digest: DigestBuilder = DigestBuilder::new();
        digest.update_u64(self.units.len() as u64);

        for unit in &self.units {
            match unit {
                WriteUnit::Batch(ops) => {
                    digest.update_str("batch").update_u64(ops.len() as u64);
                    for op in ops {
                        digest
                            .update_str(&op.path)
                            .update_u64(op.total_size)
                            .update_str(&op.content_type)
                            .update_u64(u64::from(op.encoding.id()))
                            .update_u64(op.segment.offset)
                            .update_bytes(&op.data);
                    }
                }
                WriteUnit::Append(op) => {
                    digest
                        .update_str("append")
                        .update_str(&op.path)
                        .update_u64(op.segment.offset)
                        .update_bytes(&op.data);
                }
            }
        }

        digest.finish_hex()
    }
}
