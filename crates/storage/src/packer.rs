//! Packing of upload candidates into write units.
//!
//! First segments of several files share a batch as long as the batch keeps
//! whole storage units of room. A file that needs continuation segments
//! closes the batch it started in; each continuation is then a standalone
//! append unit.
//!
//! The packing step is a pure function over [`PackerState`] so it can be
//! driven one file at a time and tested without any storage.

use crate::diff::UploadCandidate;
use crate::plan::{AppendSegment, CreateOrReplace, Plan, WriteUnit};
use crate::segment::{layout_segments, BatchLimits, Segment};
use crate::types::EncodedFile;

/// Open batch carried between files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackerState {
    /// First segments queued in the open batch.
    pub current_batch: Vec<CreateOrReplace>,
    /// Sum of queued segment lengths.
    pub current_batch_bytes: u64,
}

impl PackerState {
    /// Close the open batch, returning it as a unit if it holds anything.
    pub fn flush(&mut self) -> Option<WriteUnit> {
        if self.current_batch.is_empty() {
            return None;
        }
        let batch: Vec<CreateOrReplace> = std::mem::take(&mut self.current_batch);
        log::debug!(
            "Flushing batch of {} files ({} bytes)",
            batch.len(),
            self.current_batch_bytes
        );
        self.current_batch_bytes = 0;
        Some(WriteUnit::Batch(batch))
    }

    /// Close any open batch at the end of planning.
    pub fn finish(mut self) -> Option<WriteUnit> {
        self.flush()
    }
}

/// Pack one file into the running state.
///
/// # Arguments
/// * `state` - Open batch from previous files
/// * `candidate` - File to pack
/// * `limits` - Alignment and per-call size limits
///
/// # Returns
/// The new state and the units completed by this step, in order.
pub fn pack_step(
    mut state: PackerState,
    candidate: &UploadCandidate,
    limits: &BatchLimits,
) -> (PackerState, Vec<WriteUnit>) {
    let file: &EncodedFile = &candidate.file;
    let mut units: Vec<WriteUnit> = Vec::new();

    let room: u64 = limits.max_batch_bytes() - state.current_batch_bytes;
    let mut initial: u64 = file.encoded_size.min(limits.align_down(room));

    if initial == 0 {
        units.extend(state.flush());
        initial = file.encoded_size.min(limits.max_batch_bytes());
    }

    let segments: Vec<Segment> = layout_segments(file.encoded_size, initial, limits);
    let segment_count: usize = segments.len();
    let first: Segment = segments[0];

    state.current_batch.push(CreateOrReplace {
        path: file.path.clone(),
        total_size: file.encoded_size,
        original_size: file.original_size,
        content_type: file.content_type.clone(),
        encoding: file.encoding,
        segment: first,
        data: first.slice(&file.data).to_vec(),
        segment_count,
        replaces_existing: candidate.replaces_existing,
    });
    state.current_batch_bytes += first.length;

    if segment_count > 1 {
        log::debug!(
            "{} needs {} segments, closing the open batch",
            file.path,
            segment_count
        );
        units.extend(state.flush());

        for (index, segment) in segments.iter().enumerate().skip(1) {
            units.push(WriteUnit::Append(AppendSegment {
                path: file.path.clone(),
                segment: *segment,
                data: segment.slice(&file.data).to_vec(),
                segment_index: index,
                segment_count,
            }));
        }
    }

    (state, units)
}

/// Build the full plan for the files to upload, in order.
pub fn plan_uploads(candidates: &[UploadCandidate], limits: &BatchLimits) -> Plan {
    let mut state: PackerState = PackerState::default();
    let mut units: Vec<WriteUnit> = Vec::new();

    for candidate in candidates {
        let (next, completed) = pack_step(state, candidate, limits);
        state = next;
        units.extend(completed);
    }
    units.extend(state.finish());

    let plan: Plan = Plan::new(units);
    log::info!(
        "Planned {} files into {} write units ({} bytes)",
        candidates.len(),
        plan.len(),
        plan.total_bytes()
    );
    plan
}
