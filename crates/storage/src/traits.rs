//! Storage traits/interfaces for site storage operations.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::plan::WriteUnit;
use crate::types::{
    Confirmation, ContinuationToken, OperationHandle, RemoteFileMeta, SegmentRead, SiteTarget,
};

/// Low-level operations on a segmented, append-only site store - implemented
/// by each backend.
///
/// Writes go through three steps: a dry-run `simulate`, a `submit` that
/// returns a handle, and `await_confirmation` on that handle. Callers never
/// submit a unit before the previous one is confirmed.
#[async_trait]
pub trait SiteStorage: Send + Sync {
    /// List every file of a website version with its write progress.
    async fn list_files(&self, target: &SiteTarget) -> Result<Vec<RemoteFileMeta>, StorageError>;

    /// Read one segment of a file.
    ///
    /// Start with `ContinuationToken::START` and follow `SegmentRead::next`
    /// until it is `None`.
    async fn read_segment(
        &self,
        target: &SiteTarget,
        path: &str,
        token: ContinuationToken,
    ) -> Result<SegmentRead, StorageError>;

    /// Check a unit against current remote state without applying it.
    ///
    /// Returns `StorageError::Precondition` when the unit would be rejected.
    async fn simulate(&self, target: &SiteTarget, unit: &WriteUnit) -> Result<(), StorageError>;

    /// Submit a unit for inclusion.
    async fn submit(
        &self,
        target: &SiteTarget,
        unit: &WriteUnit,
    ) -> Result<OperationHandle, StorageError>;

    /// Wait until a submitted unit is confirmed or has failed.
    async fn await_confirmation(
        &self,
        handle: &OperationHandle,
    ) -> Result<Confirmation, StorageError>;
}
