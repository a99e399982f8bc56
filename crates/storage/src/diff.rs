//! Content diffing of local encoded files against the remote inventory.
//!
//! Classification per file:
//! - not on the remote, or a different size: upload, without reading anything
//! - same size: read the remote copy and compare bytes
//!   - identical: skip
//!   - different: upload
//!   - read failed or file incomplete: upload, flagged as uncertain
//!
//! Any doubt resolves to upload; a file is only skipped when it is provably
//! identical.

use std::collections::HashMap;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::error::StorageError;
use crate::inventory::RemoteInventory;
use crate::traits::SiteStorage;
use crate::types::{EncodedFile, RemoteFileMeta};

/// Why a file must be uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UploadReason {
    /// No file at this path remotely.
    New,
    /// Remote declared size differs from the encoded size.
    SizeChanged,
    /// Same size, different bytes.
    ContentChanged,
}

/// Result of comparing one file with its remote counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DiffOutcome {
    /// Provably identical remotely.
    Skip,
    /// Provably different remotely.
    Upload { reason: UploadReason },
    /// Could not be verified; uploaded to be safe.
    UploadDueToUncertainty { detail: String },
}

impl DiffOutcome {
    /// Whether the file goes into the plan.
    pub fn needs_upload(&self) -> bool {
        !matches!(self, DiffOutcome::Skip)
    }
}

/// A file classified for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCandidate {
    /// Encoded file.
    pub file: EncodedFile,
    /// Why it is uploaded.
    pub outcome: DiffOutcome,
    /// Whether the upload overwrites an existing remote file.
    pub replaces_existing: bool,
}

impl UploadCandidate {
    /// Candidate for a file that does not exist remotely.
    pub fn new_file(file: EncodedFile) -> Self {
        Self {
            file,
            outcome: DiffOutcome::Upload {
                reason: UploadReason::New,
            },
            replaces_existing: false,
        }
    }
}

/// Result of diffing a set of files.
#[derive(Debug, Clone, Default)]
pub struct DiffResult {
    /// Files to upload, in input order.
    pub to_upload: Vec<UploadCandidate>,
    /// Files already present with identical content.
    pub skipped: Vec<EncodedFile>,
}

impl DiffResult {
    /// Files uploaded only because they could not be verified.
    pub fn uncertain(&self) -> impl Iterator<Item = &UploadCandidate> {
        self.to_upload
            .iter()
            .filter(|c| matches!(c.outcome, DiffOutcome::UploadDueToUncertainty { .. }))
    }
}

/// Classifies encoded files as upload or skip.
pub struct ContentDiffer<'a, 'c, C: SiteStorage + ?Sized> {
    inventory: &'a RemoteInventory<'c, C>,
    concurrency: usize,
}

impl<'a, 'c, C: SiteStorage + ?Sized> ContentDiffer<'a, 'c, C> {
    /// Create a differ reading through `inventory`.
    ///
    /// # Arguments
    /// * `inventory` - Remote inventory of the target version
    /// * `concurrency` - Maximum concurrent remote reads (at least 1)
    pub fn new(inventory: &'a RemoteInventory<'c, C>, concurrency: usize) -> Self {
        Self {
            inventory,
            concurrency: concurrency.max(1),
        }
    }

    /// Classify every file against a freshly fetched remote listing.
    ///
    /// # Errors
    /// Returns error only if the listing itself fails. Per-file read failures
    /// become `UploadDueToUncertainty`.
    pub async fn diff(&self, files: Vec<EncodedFile>) -> Result<DiffResult, StorageError> {
        let remote: HashMap<String, RemoteFileMeta> = self.inventory.index().await?;
        Ok(self.diff_against(files, &remote).await)
    }

    /// Classify every file against an already fetched remote listing.
    ///
    /// Size-matched reads run concurrently; all finish before this returns.
    pub async fn diff_against(
        &self,
        files: Vec<EncodedFile>,
        remote: &HashMap<String, RemoteFileMeta>,
    ) -> DiffResult {
        let classified: Vec<(EncodedFile, DiffOutcome, bool)> = stream::iter(files)
            .map(|file| async move {
                let meta: Option<&RemoteFileMeta> = remote.get(&file.path);
                let outcome: DiffOutcome = self.classify(&file, meta).await;
                (file, outcome, meta.is_some())
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut result = DiffResult::default();
        for (file, outcome, replaces_existing) in classified {
            match outcome {
                DiffOutcome::Skip => {
                    log::info!("Skipping {} (identical remote copy)", file.path);
                    result.skipped.push(file);
                }
                outcome => {
                    log::debug!("Uploading {}: {:?}", file.path, outcome);
                    result.to_upload.push(UploadCandidate {
                        file,
                        outcome,
                        replaces_existing,
                    });
                }
            }
        }

        result
    }

    /// Classify one file.
    pub async fn classify(&self, file: &EncodedFile, meta: Option<&RemoteFileMeta>) -> DiffOutcome {
        let meta: &RemoteFileMeta = match meta {
            None => {
                return DiffOutcome::Upload {
                    reason: UploadReason::New,
                }
            }
            Some(meta) => meta,
        };

        if meta.declared_size != file.encoded_size {
            return DiffOutcome::Upload {
                reason: UploadReason::SizeChanged,
            };
        }

        match self.inventory.read_verified(meta).await {
            Ok(remote_data) if remote_data == file.data => DiffOutcome::Skip,
            Ok(_) => DiffOutcome::Upload {
                reason: UploadReason::ContentChanged,
            },
            Err(e) => {
                log::warn!("Could not verify remote copy of {}: {}", file.path, e);
                DiffOutcome::UploadDueToUncertainty {
                    detail: e.to_string(),
                }
            }
        }
    }
}
