//! `SiteStorage` implementation backed by process memory.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusty_sitepush_storage::{
    AppendSegment, BatchLimits, Confirmation, ContentEncoding, ContentKey, ContinuationToken,
    CreateOrReplace, OperationHandle, RemoteFileMeta, SegmentRead, SiteStorage, SiteTarget,
    StorageError, WriteUnit,
};

/// A file as held by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub content_type: String,
    pub encoding: ContentEncoding,
    /// Encoded size declared at creation.
    pub declared_size: u64,
    pub original_size: u64,
    /// Written data, one entry per storage unit.
    pub chunks: Vec<Vec<u8>>,
    /// Bytes written so far.
    pub written_size: u64,
}

impl StoredFile {
    /// Whether every declared byte has been written.
    pub fn is_complete(&self) -> bool {
        self.written_size == self.declared_size
    }

    /// Written bytes, concatenated.
    pub fn bytes(&self) -> Vec<u8> {
        self.chunks.concat()
    }
}

#[derive(Debug, Default)]
struct VersionState {
    locked: bool,
    files: BTreeMap<String, StoredFile>,
}

/// A submitted unit awaiting confirmation.
#[derive(Debug)]
struct PendingWrite {
    number: usize,
    target: SiteTarget,
    unit: WriteUnit,
}

#[derive(Debug, Default)]
struct State {
    versions: HashMap<SiteTarget, VersionState>,
    pending: HashMap<OperationHandle, PendingWrite>,
    submissions: usize,
    reads: usize,
    rejected_submissions: HashSet<usize>,
    failed_confirmations: HashSet<usize>,
    failing_reads: HashSet<String>,
}

/// In-memory segmented site store.
#[derive(Debug)]
pub struct MemorySiteStorage {
    limits: BatchLimits,
    chunks_per_read: usize,
    state: Mutex<State>,
}

impl Default for MemorySiteStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySiteStorage {
    /// Create an empty store with default limits.
    pub fn new() -> Self {
        Self::with_limits(BatchLimits::default())
    }

    /// Create an empty store enforcing `limits`.
    pub fn with_limits(limits: BatchLimits) -> Self {
        Self {
            limits,
            chunks_per_read: 1,
            state: Mutex::new(State::default()),
        }
    }

    /// Return up to `chunks` storage units per segment read.
    pub fn with_chunks_per_read(mut self, chunks: usize) -> Self {
        self.chunks_per_read = chunks.max(1);
        self
    }

    /// Size limits enforced on writes.
    pub fn limits(&self) -> BatchLimits {
        self.limits
    }

    /// Reject all further writes to a version.
    pub fn lock_version(&self, target: &SiteTarget) -> Result<(), StorageError> {
        let mut state = self.state()?;
        state.versions.entry(target.clone()).or_default().locked = true;
        log::debug!("Locked {}", target);
        Ok(())
    }

    /// Fail the n-th submission (1-based) before it reaches the store.
    pub fn reject_submission(&self, number: usize) -> Result<(), StorageError> {
        self.state()?.rejected_submissions.insert(number);
        Ok(())
    }

    /// Report the n-th submission (1-based) as failed at confirmation,
    /// without applying it.
    pub fn fail_confirmation(&self, number: usize) -> Result<(), StorageError> {
        self.state()?.failed_confirmations.insert(number);
        Ok(())
    }

    /// Make every read of `path` fail with a retryable network error.
    pub fn fail_reads(&self, path: &str) -> Result<(), StorageError> {
        self.state()?.failing_reads.insert(path.to_string());
        Ok(())
    }

    /// Place a file directly, bypassing write rules.
    ///
    /// Only `written` bytes are stored; a `declared_size` above that leaves
    /// the file incomplete.
    pub fn insert_file(
        &self,
        target: &SiteTarget,
        path: &str,
        declared_size: u64,
        written: &[u8],
    ) -> Result<(), StorageError> {
        let mut state = self.state()?;
        let file = StoredFile {
            content_type: "application/octet-stream".to_string(),
            encoding: ContentEncoding::None,
            declared_size,
            original_size: declared_size,
            chunks: self.split_chunks(written),
            written_size: written.len() as u64,
        };
        state
            .versions
            .entry(target.clone())
            .or_default()
            .files
            .insert(path.to_string(), file);
        Ok(())
    }

    /// Copy of a stored file.
    pub fn file(
        &self,
        target: &SiteTarget,
        path: &str,
    ) -> Result<Option<StoredFile>, StorageError> {
        let state = self.state()?;
        Ok(state
            .versions
            .get(target)
            .and_then(|v| v.files.get(path))
            .cloned())
    }

    /// Number of submissions accepted or rejected so far.
    pub fn submission_count(&self) -> Result<usize, StorageError> {
        Ok(self.state()?.submissions)
    }

    /// Number of segment reads served so far.
    pub fn read_count(&self) -> Result<usize, StorageError> {
        Ok(self.state()?.reads)
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, StorageError> {
        self.state.lock().map_err(|_| StorageError::Other {
            message: "memory store state poisoned".into(),
        })
    }

    fn split_chunks(&self, data: &[u8]) -> Vec<Vec<u8>> {
        data.chunks(self.limits.storage_unit() as usize)
            .map(<[u8]>::to_vec)
            .collect()
    }

    /// Check a unit against a version's current files.
    fn check_unit(
        &self,
        version: Option<&VersionState>,
        unit: &WriteUnit,
    ) -> Result<(), StorageError> {
        if version.map_or(false, |v| v.locked) {
            return Err(precondition("version is locked"));
        }
        if unit.payload_bytes() > self.limits.max_batch_bytes() {
            return Err(precondition(format!(
                "payload of {} bytes exceeds {} bytes per call",
                unit.payload_bytes(),
                self.limits.max_batch_bytes()
            )));
        }

        match unit {
            WriteUnit::Batch(ops) => {
                if ops.is_empty() {
                    return Err(precondition("empty batch"));
                }
                let mut seen: HashSet<&str> = HashSet::new();
                for op in ops {
                    if !seen.insert(op.path.as_str()) {
                        return Err(precondition(format!("{} appears twice in batch", op.path)));
                    }
                    self.check_create(op)?;
                }
                Ok(())
            }
            WriteUnit::Append(op) => {
                let file: Option<&StoredFile> = version.and_then(|v| v.files.get(&op.path));
                self.check_append(file, op)
            }
        }
    }

    fn check_create(&self, op: &CreateOrReplace) -> Result<(), StorageError> {
        if op.segment.offset != 0 {
            return Err(precondition(format!("{}: first segment must start at 0", op.path)));
        }
        if op.data.len() as u64 != op.segment.length || op.segment.length > op.total_size {
            return Err(precondition(format!("{}: segment length mismatch", op.path)));
        }
        self.check_alignment(&op.path, op.segment.length, op.segment.end() == op.total_size)
    }

    fn check_append(
        &self,
        file: Option<&StoredFile>,
        op: &AppendSegment,
    ) -> Result<(), StorageError> {
        let file: &StoredFile =
            file.ok_or_else(|| precondition(format!("{}: no such file", op.path)))?;
        if file.is_complete() {
            return Err(precondition(format!("{}: file already complete", op.path)));
        }
        if op.segment.offset != file.written_size {
            return Err(precondition(format!(
                "{}: append at {} but {} bytes written",
                op.path, op.segment.offset, file.written_size
            )));
        }
        if op.data.len() as u64 != op.segment.length || op.segment.end() > file.declared_size {
            return Err(precondition(format!("{}: segment length mismatch", op.path)));
        }
        self.check_alignment(&op.path, op.segment.length, op.segment.end() == file.declared_size)
    }

    fn check_alignment(&self, path: &str, length: u64, is_final: bool) -> Result<(), StorageError> {
        if !is_final && length % self.limits.storage_unit() != 0 {
            return Err(precondition(format!(
                "{}: non-final segment of {} bytes is not unit aligned",
                path, length
            )));
        }
        Ok(())
    }

    fn apply(&self, version: &mut VersionState, unit: &WriteUnit) {
        match unit {
            WriteUnit::Batch(ops) => {
                for op in ops {
                    log::debug!(
                        "Writing {} ({} of {} bytes)",
                        op.path,
                        op.segment.length,
                        op.total_size
                    );
                    version.files.insert(
                        op.path.clone(),
                        StoredFile {
                            content_type: op.content_type.clone(),
                            encoding: op.encoding,
                            declared_size: op.total_size,
                            original_size: op.original_size,
                            chunks: self.split_chunks(&op.data),
                            written_size: op.segment.length,
                        },
                    );
                }
            }
            WriteUnit::Append(op) => {
                if let Some(file) = version.files.get_mut(&op.path) {
                    log::debug!("Appending {} bytes to {}", op.segment.length, op.path);
                    file.chunks.extend(self.split_chunks(&op.data));
                    file.written_size += op.segment.length;
                }
            }
        }
    }
}

fn precondition(message: impl Into<String>) -> StorageError {
    StorageError::Precondition {
        message: message.into(),
    }
}

#[async_trait]
impl SiteStorage for MemorySiteStorage {
    async fn list_files(&self, target: &SiteTarget) -> Result<Vec<RemoteFileMeta>, StorageError> {
        let state = self.state()?;
        let files: Vec<RemoteFileMeta> = match state.versions.get(target) {
            None => Vec::new(),
            Some(version) => version
                .files
                .iter()
                .map(|(path, file)| RemoteFileMeta {
                    path: path.clone(),
                    content_key: ContentKey(format!("{}/{}", target, path)),
                    declared_size: file.declared_size,
                    written_size: file.written_size,
                    complete: file.is_complete(),
                })
                .collect(),
        };
        Ok(files)
    }

    async fn read_segment(
        &self,
        target: &SiteTarget,
        path: &str,
        token: ContinuationToken,
    ) -> Result<SegmentRead, StorageError> {
        let mut state = self.state()?;
        state.reads += 1;

        if state.failing_reads.contains(path) {
            return Err(StorageError::NetworkError {
                message: format!("read of {} failed", path),
                retryable: true,
            });
        }

        let file: &StoredFile = state
            .versions
            .get(target)
            .and_then(|v| v.files.get(path))
            .ok_or_else(|| StorageError::NotFound {
                path: path.to_string(),
            })?;

        let unit: u64 = self.limits.storage_unit();
        let expected_chunks: usize = file.declared_size.div_ceil(unit) as usize;
        let start: usize = token.0 as usize;

        if start == 0 && expected_chunks == 0 {
            return Ok(SegmentRead {
                data: Vec::new(),
                next: None,
            });
        }
        if start >= file.chunks.len() {
            return Err(StorageError::ContinuationUnresolved {
                path: path.to_string(),
                token: token.0,
                message: format!("{} of {} chunks written", file.chunks.len(), expected_chunks),
            });
        }

        let end: usize = (start + self.chunks_per_read).min(file.chunks.len());
        let data: Vec<u8> = file.chunks[start..end].concat();
        let next: Option<ContinuationToken> = if end < expected_chunks {
            Some(ContinuationToken(end as u64))
        } else {
            None
        };

        Ok(SegmentRead { data, next })
    }

    async fn simulate(&self, target: &SiteTarget, unit: &WriteUnit) -> Result<(), StorageError> {
        let state = self.state()?;
        self.check_unit(state.versions.get(target), unit)
    }

    async fn submit(
        &self,
        target: &SiteTarget,
        unit: &WriteUnit,
    ) -> Result<OperationHandle, StorageError> {
        let mut state = self.state()?;
        state.submissions += 1;
        let number: usize = state.submissions;

        if state.rejected_submissions.contains(&number) {
            return Err(StorageError::Submission {
                message: format!("submission {} rejected", number),
            });
        }

        let handle = OperationHandle(format!("0x{:064x}", number));
        state.pending.insert(
            handle.clone(),
            PendingWrite {
                number,
                target: target.clone(),
                unit: unit.clone(),
            },
        );
        log::debug!("Accepted {} as {}", unit.describe(), handle);
        Ok(handle)
    }

    async fn await_confirmation(
        &self,
        handle: &OperationHandle,
    ) -> Result<Confirmation, StorageError> {
        let mut state = self.state()?;
        let PendingWrite {
            number,
            target,
            unit,
        } = state
            .pending
            .remove(handle)
            .ok_or_else(|| StorageError::Confirmation {
                handle: handle.to_string(),
                message: "unknown operation".into(),
            })?;

        if state.failed_confirmations.contains(&number) {
            return Ok(Confirmation::Failed {
                reason: "reverted".into(),
            });
        }

        // State may have moved since simulation.
        if let Err(e) = self.check_unit(state.versions.get(&target), &unit) {
            return Ok(Confirmation::Failed {
                reason: e.to_string(),
            });
        }

        let version: &mut VersionState = state.versions.entry(target).or_default();
        self.apply(version, &unit);
        Ok(Confirmation::Confirmed)
    }
}
