//! Shared constants used across rusty-sitepush crates.

/// Allocation granularity of the segmented storage backend (one SSTORE2 data
/// contract holds `0x6000 - 1` bytes).
///
/// Every segment of a file except the last must be an exact multiple of this.
pub const STORAGE_UNIT: u64 = 0x6000 - 1;

/// Storage units allowed in a single write call.
///
/// Calls are capped well below the transaction size limit (131072 bytes)
/// because larger payloads exceed the block gas limit.
pub const DEFAULT_UNITS_PER_BATCH: u64 = 3;

/// Maximum bytes carried by one write call with the default settings.
pub const MAX_BATCH_BYTES: u64 = STORAGE_UNIT * DEFAULT_UNITS_PER_BATCH;

/// Default number of concurrent remote reads while diffing.
pub const DEFAULT_DIFF_CONCURRENCY: usize = 4;

/// Default time to wait for a submitted unit to be confirmed (5 minutes).
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 300;

/// Content type used when the extension is unknown.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
