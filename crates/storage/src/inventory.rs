//! Remote inventory of a website version.
//!
//! Lists what is already stored and reassembles file contents by following
//! segment continuations. Reads never return partial data: a continuation
//! that cannot be followed is an error.

use std::collections::{HashMap, HashSet};

use crate::error::StorageError;
use crate::traits::SiteStorage;
use crate::types::{ContinuationToken, RemoteFileMeta, SegmentRead, SiteTarget};

/// Read-side view of one website version.
pub struct RemoteInventory<'a, C: SiteStorage + ?Sized> {
    client: &'a C,
    target: SiteTarget,
}

impl<'a, C: SiteStorage + ?Sized> RemoteInventory<'a, C> {
    /// Create an inventory for a target.
    ///
    /// # Arguments
    /// * `client` - Storage backend
    /// * `target` - Website and version to inspect
    pub fn new(client: &'a C, target: SiteTarget) -> Self {
        Self { client, target }
    }

    /// Target being inspected.
    pub fn target(&self) -> &SiteTarget {
        &self.target
    }

    /// List every remote file with its sizes and completeness.
    pub async fn list_files(&self) -> Result<Vec<RemoteFileMeta>, StorageError> {
        let files: Vec<RemoteFileMeta> = self.client.list_files(&self.target).await?;
        log::debug!("{} has {} remote files", self.target, files.len());
        Ok(files)
    }

    /// Remote files keyed by website path.
    pub async fn index(&self) -> Result<HashMap<String, RemoteFileMeta>, StorageError> {
        Ok(self
            .list_files()
            .await?
            .into_iter()
            .map(|meta| (meta.path.clone(), meta))
            .collect())
    }

    /// Read a file fully by following its continuation chain.
    ///
    /// # Errors
    /// Returns the backend error for any failed segment read, and
    /// `ContinuationUnresolved` if the chain loops back on itself.
    pub async fn read_full(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let mut data: Vec<u8> = Vec::new();
        let mut visited: HashSet<ContinuationToken> = HashSet::new();
        let mut token: ContinuationToken = ContinuationToken::START;

        loop {
            if !visited.insert(token) {
                return Err(StorageError::ContinuationUnresolved {
                    path: path.to_string(),
                    token: token.0,
                    message: "continuation chain loops".into(),
                });
            }

            let read: SegmentRead = self.client.read_segment(&self.target, path, token).await?;
            data.extend_from_slice(&read.data);

            match read.next {
                Some(next) => token = next,
                None => break,
            }
        }

        Ok(data)
    }

    /// Read a file whose metadata is known, verifying it is complete.
    ///
    /// Incomplete files are rejected without issuing any read.
    ///
    /// # Errors
    /// Returns `ContinuationUnresolved` for an incomplete file and
    /// `SizeMismatch` if the bytes read disagree with the declared size.
    pub async fn read_verified(&self, meta: &RemoteFileMeta) -> Result<Vec<u8>, StorageError> {
        if !meta.complete {
            return Err(StorageError::ContinuationUnresolved {
                path: meta.path.clone(),
                token: meta.written_size,
                message: format!(
                    "file incomplete: {} of {} bytes written",
                    meta.written_size, meta.declared_size
                ),
            });
        }

        let data: Vec<u8> = self.read_full(&meta.path).await?;
        if data.len() as u64 != meta.declared_size {
            return Err(StorageError::SizeMismatch {
                path: meta.path.clone(),
                expected: meta.declared_size,
                actual: data.len() as u64,
            });
        }

        Ok(data)
    }
}
