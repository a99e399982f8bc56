//! Scripted `SiteStorage` used by unit tests in this crate.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::plan::WriteUnit;
use crate::traits::SiteStorage;
use crate::types::{
    Confirmation, ContentKey, ContinuationToken, OperationHandle, RemoteFileMeta, SegmentRead,
    SiteTarget,
};

/// Remote file served by the scripted store.
struct ScriptedFile {
    meta: RemoteFileMeta,
    segments: Vec<Vec<u8>>,
    /// Token returned after the last segment instead of ending the chain.
    loop_to: Option<u64>,
}

/// Storage whose reads come from fixed data and whose writes follow a script.
///
/// Writes are recorded but never applied.
#[derive(Default)]
pub(crate) struct ScriptedStorage {
    files: Vec<ScriptedFile>,
    failing_reads: HashMap<String, StorageError>,
    simulate_failures: HashMap<usize, StorageError>,
    submit_failures: HashMap<usize, StorageError>,
    confirmations: Mutex<VecDeque<Confirmation>>,
    confirmation_delay: Option<Duration>,
    reads: AtomicUsize,
    simulations: AtomicUsize,
    submissions: AtomicUsize,
    submitted: Mutex<Vec<String>>,
}

impl ScriptedStorage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Serve a complete file split into the given segments.
    pub(crate) fn with_file(mut self, path: &str, segments: Vec<Vec<u8>>) -> Self {
        let size: u64 = segments.iter().map(|s| s.len() as u64).sum();
        self.files.push(ScriptedFile {
            meta: RemoteFileMeta {
                path: path.to_string(),
                content_key: ContentKey(format!("key:{}", path)),
                declared_size: size,
                written_size: size,
                complete: true,
            },
            segments,
            loop_to: None,
        });
        self
    }

    /// Serve a file whose last segment points back to `loop_to`.
    pub(crate) fn with_looping_file(
        mut self,
        path: &str,
        segments: Vec<Vec<u8>>,
        loop_to: u64,
    ) -> Self {
        self = self.with_file(path, segments);
        if let Some(file) = self.files.last_mut() {
            file.loop_to = Some(loop_to);
        }
        self
    }

    /// Serve a file whose declared size exceeds what was written.
    pub(crate) fn with_incomplete_file(
        mut self,
        path: &str,
        declared: u64,
        written: Vec<u8>,
    ) -> Self {
        self.files.push(ScriptedFile {
            meta: RemoteFileMeta {
                path: path.to_string(),
                content_key: ContentKey(format!("key:{}", path)),
                declared_size: declared,
                written_size: written.len() as u64,
                complete: false,
            },
            segments: vec![written],
            loop_to: None,
        });
        self
    }

    /// Make every read of `path` fail.
    pub(crate) fn with_failing_read(mut self, path: &str, error: StorageError) -> Self {
        self.failing_reads.insert(path.to_string(), error);
        self
    }

    /// Reject the simulation of the n-th simulated unit (0-based).
    pub(crate) fn with_simulate_failure(mut self, index: usize, error: StorageError) -> Self {
        self.simulate_failures.insert(index, error);
        self
    }

    /// Reject the submission of the n-th submitted unit (0-based).
    pub(crate) fn with_submit_failure(mut self, index: usize, error: StorageError) -> Self {
        self.submit_failures.insert(index, error);
        self
    }

    /// Queue confirmation results; once exhausted every unit is confirmed.
    pub(crate) fn with_confirmations(self, confirmations: Vec<Confirmation>) -> Self {
        *self.confirmations.lock().unwrap() = confirmations.into();
        self
    }

    /// Delay every confirmation.
    pub(crate) fn with_confirmation_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = Some(delay);
        self
    }

    pub(crate) fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn simulation_count(&self) -> usize {
        self.simulations.load(Ordering::SeqCst)
    }

    pub(crate) fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl SiteStorage for ScriptedStorage {
    async fn list_files(&self, _target: &SiteTarget) -> Result<Vec<RemoteFileMeta>, StorageError> {
        Ok(self.files.iter().map(|f| f.meta.clone()).collect())
    }

    async fn read_segment(
        &self,
        _target: &SiteTarget,
        path: &str,
        token: ContinuationToken,
    ) -> Result<SegmentRead, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.failing_reads.get(path) {
            return Err(error.clone());
        }

        let file: &ScriptedFile = self
            .files
            .iter()
            .find(|f| f.meta.path == path)
            .ok_or_else(|| StorageError::NotFound {
                path: path.to_string(),
            })?;

        let index: usize = token.0 as usize;
        let data: Vec<u8> = file.segments.get(index).cloned().ok_or_else(|| {
            StorageError::ContinuationUnresolved {
                path: path.to_string(),
                token: token.0,
                message: "no such segment".into(),
            }
        })?;

        let next: Option<ContinuationToken> =
            if index + 1 < file.segments.len() || !file.meta.complete {
                Some(ContinuationToken(token.0 + 1))
            } else {
                file.loop_to.map(ContinuationToken)
            };

        Ok(SegmentRead { data, next })
    }

    async fn simulate(&self, _target: &SiteTarget, _unit: &WriteUnit) -> Result<(), StorageError> {
        let index: usize = self.simulations.fetch_add(1, Ordering::SeqCst);
        match self.simulate_failures.get(&index) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn submit(
        &self,
        _target: &SiteTarget,
        unit: &WriteUnit,
    ) -> Result<OperationHandle, StorageError> {
        let index: usize = self.submissions.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.submit_failures.get(&index) {
            return Err(error.clone());
        }
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(unit.describe());
        Ok(OperationHandle(format!("0x{:04x}", submitted.len())))
    }

    async fn await_confirmation(
        &self,
        _handle: &OperationHandle,
    ) -> Result<Confirmation, StorageError> {
        if let Some(delay) = self.confirmation_delay {
            tokio::time::sleep(delay).await;
        }
        let next: Option<Confirmation> = self.confirmations.lock().unwrap().pop_front();
        Ok(next.unwrap_or(Confirmation::Confirmed))
    }
}
