//! Upload orchestration for a versioned site.
//!
//! This module ties the pipeline together for any `SiteStorage`
//! implementation:
//!
//! - Encoding local candidates
//! - Fetching the remote inventory and diffing against it
//! - Packing what changed into an ordered plan
//! - Executing the plan one unit at a time
//!
//! Preparation has no remote side effects, so a caller can show the
//! summary, ask for confirmation and simply drop the preparation to abort.
//!
//! # Example
//!
//! ```ignore
//! use rusty_sitepush_storage::{SiteTarget, SiteUploader, UploadOptions};
//!
//! let uploader = SiteUploader::new(&client, SiteTarget::new("0xsite", 0));
//! let prepared = uploader.prepare(candidates).await?;
//! println!("{}", prepared.summary);
//! let report = uploader.execute(&prepared, None).await;
//! ```

use std::collections::HashSet;
use std::time::Duration;

use rusty_sitepush_common::{
    normalize_site_path, FileCandidate, ProgressCallback, DEFAULT_CONFIRMATION_TIMEOUT_SECS,
    DEFAULT_DIFF_CONCURRENCY,
};

use crate::compress::Compressor;
use crate::diff::{ContentDiffer, DiffOutcome, DiffResult};
use crate::error::StorageError;
use crate::executor::{ExecutionProgress, ExecutionReport, ExecutorOptions, TransactionExecutor};
use crate::inventory::RemoteInventory;
use crate::packer::plan_uploads;
use crate::plan::Plan;
use crate::segment::BatchLimits;
use crate::summary::PlanSummary;
use crate::traits::SiteStorage;
use crate::types::{ContentEncoding, EncodedFile, SiteTarget};

/// Options for upload operations.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Encoding applied before upload.
    pub encoding: ContentEncoding,
    /// Alignment and per-call size limits.
    pub limits: BatchLimits,
    /// Maximum concurrent remote reads while diffing.
    pub diff_concurrency: usize,
    /// Per-unit confirmation timeout in seconds.
    pub confirmation_timeout_secs: u64,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            encoding: ContentEncoding::default(),
            limits: BatchLimits::default(),
            diff_concurrency: DEFAULT_DIFF_CONCURRENCY,
            confirmation_timeout_secs: DEFAULT_CONFIRMATION_TIMEOUT_SECS,
        }
    }
}

impl UploadOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the content encoding.
    pub fn with_encoding(mut self, encoding: ContentEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the batch limits.
    pub fn with_limits(mut self, limits: BatchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the diff read concurrency.
    pub fn with_diff_concurrency(mut self, concurrency: usize) -> Self {
        self.diff_concurrency = concurrency;
        self
    }

    /// Set the confirmation timeout.
    pub fn with_confirmation_timeout_secs(mut self, seconds: u64) -> Self {
        self.confirmation_timeout_secs = seconds;
        self
    }
}

/// Everything decided before the first write.
#[derive(Debug, Clone)]
pub struct UploadPreparation {
    /// Ordered write units.
    pub plan: Plan,
    /// Files identical remotely.
    pub skipped: Vec<EncodedFile>,
    /// Diff outcome for every file that goes into the plan, in input order.
    pub outcomes: Vec<(String, DiffOutcome)>,
    /// Review text and totals.
    pub summary: PlanSummary,
}

impl UploadPreparation {
    /// Whether there is nothing to upload.
    pub fn is_empty(&self) -> bool {
        self.plan.is_empty()
    }
}

/// High-level upload operations using any `SiteStorage` implementation.
pub struct SiteUploader<'a, C: SiteStorage + ?Sized> {
    client: &'a C,
    target: SiteTarget,
    options: UploadOptions,
}

impl<'a, C: SiteStorage + ?Sized> SiteUploader<'a, C> {
    /// Create a new upload orchestrator.
    ///
    /// # Arguments
    /// * `client` - Storage backend
    /// * `target` - Website and version to upload into
    pub fn new(client: &'a C, target: SiteTarget) -> Self {
        Self {
            client,
            target,
            options: UploadOptions::default(),
        }
    }

    /// Set upload options.
    pub fn with_options(mut self, options: UploadOptions) -> Self {
        self.options = options;
        self
    }

    /// Target being uploaded to.
    pub fn target(&self) -> &SiteTarget {
        &self.target
    }

    /// Encode, diff and plan without touching remote state.
    ///
    /// Candidate paths are normalized first (`/docs//a.html` becomes
    /// `docs/a.html`).
    ///
    /// # Errors
    /// Returns `InvalidPath` for an empty or escaping path and
    /// `DuplicatePath` when two candidates resolve to the same path; both
    /// before any remote read. Also returns error if encoding fails or the
    /// remote listing cannot be fetched. Unverifiable remote files do not
    /// fail preparation; they are planned for upload.
    pub async fn prepare(
        &self,
        candidates: Vec<FileCandidate>,
    ) -> Result<UploadPreparation, StorageError> {
        let candidates: Vec<FileCandidate> = validate_candidates(candidates)?;

        let compressor: Compressor = Compressor::new(self.options.encoding);
        let encoded: Vec<EncodedFile> = compressor.encode_all(candidates)?;

        let inventory = RemoteInventory::new(self.client, self.target.clone());
        let diff: DiffResult = ContentDiffer::new(&inventory, self.options.diff_concurrency)
            .diff(encoded)
            .await?;

        let uncertain: usize = diff.uncertain().count();
        if uncertain > 0 {
            log::warn!(
                "{} file(s) could not be verified remotely and will be re-uploaded",
                uncertain
            );
        }

        let plan: Plan = plan_uploads(&diff.to_upload, &self.options.limits);
        let summary: PlanSummary = PlanSummary::new(&plan, &diff.skipped);
        let outcomes: Vec<(String, DiffOutcome)> = diff
            .to_upload
            .into_iter()
            .map(|c| (c.file.path, c.outcome))
            .collect();

        Ok(UploadPreparation {
            plan,
            skipped: diff.skipped,
            outcomes,
            summary,
        })
    }

    /// Execute a prepared plan.
    ///
    /// The preparation must be fresh: once any unit lands, remote state has
    /// changed and a retry needs a new `prepare`.
    pub async fn execute(
        &self,
        preparation: &UploadPreparation,
        progress: Option<&dyn ProgressCallback<ExecutionProgress>>,
    ) -> ExecutionReport {
        let options: ExecutorOptions = ExecutorOptions::new().with_confirmation_timeout(
            Duration::from_secs(self.options.confirmation_timeout_secs),
        );
        TransactionExecutor::new(self.client, self.target.clone())
            .with_options(options)
            .execute(&preparation.plan, progress)
            .await
    }
}

/// Normalize every candidate path and reject duplicates.
fn validate_candidates(candidates: Vec<FileCandidate>) -> Result<Vec<FileCandidate>, StorageError> {
    let mut seen: HashSet<String> = HashSet::with_capacity(candidates.len());
    candidates
        .into_iter()
        .map(|mut candidate| {
            candidate.path = normalize_site_path(&candidate.path)?;
            if !seen.insert(candidate.path.clone()) {
                return Err(StorageError::DuplicatePath {
                    path: candidate.path,
                });
            }
            Ok(candidate)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusty_sitepush_common::PathError;

    use crate::diff::UploadReason;
    use crate::test_support::ScriptedStorage;

    fn target() -> SiteTarget {
        SiteTarget::new("0xsite", 0)
    }

    fn options() -> UploadOptions {
        UploadOptions::new()
            .with_encoding(ContentEncoding::None)
            .with_limits(BatchLimits::new(100, 3).unwrap())
    }

    #[tokio::test]
    async fn test_prepare_plans_changed_files_only() {
        let store = ScriptedStorage::new().with_file("same.txt", vec![b"unchanged".to_vec()]);
        let uploader = SiteUploader::new(&store, target()).with_options(options());

        let prepared: UploadPreparation = uploader
            .prepare(vec![
                FileCandidate::new("same.txt", b"unchanged".to_vec(), "text/plain"),
                FileCandidate::new("new.txt", vec![b'n'; 250], "text/plain"),
            ])
            .await
            .unwrap();

        assert_eq!(prepared.plan.len(), 1);
        assert_eq!(prepared.skipped.len(), 1);
        assert_eq!(
            prepared.outcomes,
            vec![(
                "new.txt".to_string(),
                DiffOutcome::Upload {
                    reason: UploadReason::New
                }
            )]
        );
        assert_eq!(prepared.summary.skipped, vec!["same.txt"]);
        assert!(store.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_prepare_then_execute() {
        let store = ScriptedStorage::new();
        let uploader = SiteUploader::new(&store, target()).with_options(options());

        let prepared: UploadPreparation = uploader
            .prepare(vec![FileCandidate::new(
                "big.bin",
                vec![9u8; 450],
                "application/octet-stream",
            )])
            .await
            .unwrap();
        let report: ExecutionReport = uploader.execute(&prepared, None).await;

        assert!(report.is_success());
        assert_eq!(
            store.submitted(),
            vec!["batch[big.bin]", "append[big.bin 2/2]"]
        );
    }

    #[tokio::test]
    async fn test_prepare_with_nothing_to_do() {
        let store = ScriptedStorage::new().with_file("a.txt", vec![b"a".to_vec()]);
        let uploader = SiteUploader::new(&store, target()).with_options(options());

        let prepared: UploadPreparation = uploader
            .prepare(vec![FileCandidate::new("a.txt", b"a".to_vec(), "text/plain")])
            .await
            .unwrap();

        assert!(prepared.is_empty());
        assert!(prepared.summary.to_string().contains("Nothing to do"));
    }

    #[tokio::test]
    async fn test_prepare_rejects_duplicate_paths() {
        let store = ScriptedStorage::new();
        let uploader = SiteUploader::new(&store, target()).with_options(options());

        let err: StorageError = uploader
            .prepare(vec![
                FileCandidate::new("a.txt", b"one".to_vec(), "text/plain"),
                FileCandidate::new("/a.txt", b"two".to_vec(), "text/plain"),
            ])
            .await
            .unwrap_err();

        assert_eq!(
            err,
            StorageError::DuplicatePath {
                path: "a.txt".into()
            }
        );
        assert!(store.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_prepare_rejects_invalid_paths() {
        let store = ScriptedStorage::new();
        let uploader = SiteUploader::new(&store, target()).with_options(options());

        for bad in ["../escape", "", "a/../../b"] {
            let err: StorageError = uploader
                .prepare(vec![
                    FileCandidate::new("ok.txt", b"fine".to_vec(), "text/plain"),
                    FileCandidate::new(bad, b"x".to_vec(), "text/plain"),
                ])
                .await
                .unwrap_err();
            assert!(
                matches!(err, StorageError::InvalidPath(PathError::InvalidPath { .. })),
                "{:?} gave {:?}",
                bad,
                err
            );
        }
        assert_eq!(store.read_count(), 0);
    }

    #[tokio::test]
    async fn test_prepare_normalizes_paths() {
        let store = ScriptedStorage::new();
        let uploader = SiteUploader::new(&store, target()).with_options(options());

        let prepared: UploadPreparation = uploader
            .prepare(vec![FileCandidate::new(
                "/docs//./index.html",
                b"<html></html>".to_vec(),
                "text/html",
            )])
            .await
            .unwrap();

        assert_eq!(prepared.plan.units[0].paths(), vec!["docs/index.html"]);
    }

    #[test]
    fn test_upload_options_builder() {
        let opts = UploadOptions::new()
            .with_diff_concurrency(8)
            .with_confirmation_timeout_secs(30);
        assert_eq!(opts.diff_concurrency, 8);
        assert_eq!(opts.confirmation_timeout_secs, 30);
        assert_eq!(opts.encoding, ContentEncoding::Gzip);
    }
}
