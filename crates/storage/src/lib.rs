//! Upload planning and execution for on-chain versioned static sites.
//!
//! This crate turns a set of local files into the smallest ordered sequence of
//! write calls against segmented, append-only site storage, and runs that
//! sequence safely. It works with any backend implementing [`SiteStorage`].
//!
//! # Pipeline
//!
//! - **Compressor** - deterministic gzip (or no encoding) of each file
//! - **RemoteInventory** - listing and full reads of what is already stored
//! - **ContentDiffer** - skips files that are provably identical remotely
//! - **Packer** - splits files into aligned segments and packs first segments
//!   of several files into shared batches
//! - **TransactionExecutor** - simulate, submit and confirm each unit in order
//!
//! [`SiteUploader`] drives the whole pipeline: `prepare` has no remote side
//! effects, `execute` performs the writes.

mod compress;
mod diff;
mod error;
mod executor;
mod inventory;
mod packer;
mod plan;
mod segment;
mod summary;
mod traits;
mod types;
mod upload;

#[cfg(test)]
mod test_support;

pub use compress::{decode, Compressor};
pub use diff::{ContentDiffer, DiffOutcome, DiffResult, UploadCandidate, UploadReason};
pub use error::StorageError;
pub use executor::{
    ExecutionProgress, ExecutionReport, ExecutorOptions, FailureStage, TransactionExecutor,
    UnitFailure, UnitOutcome, UnitState,
};
pub use inventory::RemoteInventory;
pub use packer::{pack_step, plan_uploads, PackerState};
pub use plan::{AppendSegment, CreateOrReplace, Plan, WriteOperation, WriteUnit};
pub use segment::{is_valid_layout, layout_segments, BatchLimits, Segment};
pub use summary::{PlanSummary, SummaryLine, UnitSummary};
pub use traits::SiteStorage;
pub use types::{
    Confirmation, ContentEncoding, ContentKey, ContinuationToken, EncodedFile, OperationHandle,
    RemoteFileMeta, SegmentRead, SiteTarget,
};
pub use upload::{SiteUploader, UploadOptions, UploadPreparation};
