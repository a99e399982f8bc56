//! Sequential execution of an upload plan.
//!
//! Each unit goes through `Planned -> Simulated -> Submitted -> Confirmed`.
//! The first failure at any stage stops the run; nothing after it is
//! simulated or submitted. Units confirmed earlier stay committed, the store
//! is append-only and there is no rollback.

use std::time::Duration;

use rusty_sitepush_common::{ProgressCallback, DEFAULT_CONFIRMATION_TIMEOUT_SECS};
use serde::{Serialize, Serializer};

use crate::error::StorageError;
use crate::plan::{Plan, WriteUnit};
use crate::traits::SiteStorage;
use crate::types::{Confirmation, OperationHandle, SiteTarget};

/// Where a unit ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnitState {
    /// Not started.
    Planned,
    /// Dry run accepted.
    Simulated,
    /// Sent, confirmation pending.
    Submitted,
    /// Included remotely.
    Confirmed,
    /// Rejected or unconfirmed.
    Failed,
    /// Never started because the caller stopped the run.
    Cancelled,
}

/// Step at which a unit failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureStage {
    /// Dry run rejected the unit.
    Simulation,
    /// The backend refused the submission.
    Submission,
    /// Submitted but not confirmed as applied.
    Confirmation,
}

/// Final state of one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitOutcome {
    /// Position in the plan.
    pub unit_index: usize,
    /// Short label of the unit.
    pub description: String,
    /// Website paths the unit writes.
    pub paths: Vec<String>,
    /// Payload bytes carried.
    pub payload_bytes: u64,
    /// State reached when the run ended.
    pub state: UnitState,
    /// Handle returned on submission.
    pub handle: Option<OperationHandle>,
}

/// The unit that stopped the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitFailure {
    /// Position in the plan.
    pub unit_index: usize,
    /// Step that failed.
    pub stage: FailureStage,
    /// Short label of the unit.
    pub description: String,
    /// Website paths the unit writes.
    pub paths: Vec<String>,
    /// Backend error, serialized as its message.
    #[serde(serialize_with = "serialize_error")]
    pub error: StorageError,
}

fn serialize_error<S: Serializer>(error: &StorageError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&error.to_string())
}

/// Outcome of running a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    /// One entry per plan unit, in plan order.
    pub outcomes: Vec<UnitOutcome>,
    /// Set when a unit failed.
    pub failure: Option<UnitFailure>,
    /// Set when the caller stopped the run between units.
    pub cancelled: bool,
}

impl ExecutionReport {
    /// Whether every unit was confirmed.
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
            && !self.cancelled
            && self.outcomes.iter().all(|o| o.state == UnitState::Confirmed)
    }

    /// Number of confirmed units.
    pub fn confirmed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.state == UnitState::Confirmed)
            .count()
    }

    /// Payload bytes confirmed.
    pub fn confirmed_bytes(&self) -> u64 {
        self.outcomes
            .iter()
            .filter(|o| o.state == UnitState::Confirmed)
            .map(|o| o.payload_bytes)
            .sum()
    }
}

/// Progress reported before each unit starts.
#[derive(Debug, Clone)]
pub struct ExecutionProgress {
    /// Unit about to start.
    pub unit_index: usize,
    /// Units in the plan.
    pub unit_count: usize,
    /// Short label of the unit about to start.
    pub description: String,
    /// Payload bytes confirmed so far.
    pub bytes_confirmed: u64,
    /// Payload bytes of the whole plan.
    pub total_bytes: u64,
}

/// Options for plan execution.
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// How long to wait for each confirmation.
    pub confirmation_timeout: Duration,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            confirmation_timeout: Duration::from_secs(DEFAULT_CONFIRMATION_TIMEOUT_SECS),
        }
    }
}

impl ExecutorOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-unit confirmation timeout.
    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }
}

/// Runs plan units one at a time against a storage backend.
pub struct TransactionExecutor<'a, C: SiteStorage + ?Sized> {
    client: &'a C,
    target: SiteTarget,
    options: ExecutorOptions,
}

impl<'a, C: SiteStorage + ?Sized> TransactionExecutor<'a, C> {
    /// Create an executor for a target.
    pub fn new(client: &'a C, target: SiteTarget) -> Self {
        Self {
            client,
            target,
            options: ExecutorOptions::default(),
        }
    }

    /// Set execution options.
    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// Execute every unit of `plan`, in order.
    ///
    /// A unit is only submitted after the previous one is confirmed. The
    /// progress callback runs before each unit; returning `false` stops the
    /// run there and marks the remaining units `Cancelled`.
    ///
    /// # Arguments
    /// * `plan` - Plan to execute
    /// * `progress` - Optional progress callback
    ///
    /// # Returns
    /// A report with one outcome per unit. Failures are reported, not
    /// returned as errors.
    pub async fn execute(
        &self,
        plan: &Plan,
        progress: Option<&dyn ProgressCallback<ExecutionProgress>>,
    ) -> ExecutionReport {
        let mut report = ExecutionReport {
            outcomes: plan.units.iter().enumerate().map(planned_outcome).collect(),
            failure: None,
            cancelled: false,
        };
        let total_bytes: u64 = plan.total_bytes();
        let mut bytes_confirmed: u64 = 0;

        for (index, unit) in plan.units.iter().enumerate() {
            if let Some(cb) = progress {
                let update = ExecutionProgress {
                    unit_index: index,
                    unit_count: plan.len(),
                    description: report.outcomes[index].description.clone(),
                    bytes_confirmed,
                    total_bytes,
                };
                if !cb.on_progress(&update) {
                    log::info!("Upload to {} cancelled before unit {}", self.target, index);
                    for outcome in &mut report.outcomes[index..] {
                        outcome.state = UnitState::Cancelled;
                    }
                    report.cancelled = true;
                    break;
                }
            }

            let outcome = &mut report.outcomes[index];
            match self.run_unit(unit, outcome).await {
                Ok(()) => bytes_confirmed += outcome.payload_bytes,
                Err((stage, error)) => {
                    log::warn!(
                        "Unit {} ({}) failed during {:?}: {}",
                        index,
                        outcome.description,
                        stage,
                        error
                    );
                    outcome.state = UnitState::Failed;
                    report.failure = Some(UnitFailure {
                        unit_index: index,
                        stage,
                        description: outcome.description.clone(),
                        paths: outcome.paths.clone(),
                        error,
                    });
                    break;
                }
            }
        }

        report
    }

    /// Drive one unit through its states, updating `outcome` as it goes.
    async fn run_unit(
        &self,
        unit: &WriteUnit,
        outcome: &mut UnitOutcome,
    ) -> Result<(), (FailureStage, StorageError)> {
        self.client
            .simulate(&self.target, unit)
            .await
            .map_err(|e| (FailureStage::Simulation, e))?;
        outcome.state = UnitState::Simulated;
        log::debug!("Simulated {}", outcome.description);

        let handle: OperationHandle = self
            .client
            .submit(&self.target, unit)
            .await
            .map_err(|e| (FailureStage::Submission, e))?;
        outcome.state = UnitState::Submitted;
        outcome.handle = Some(handle.clone());
        log::debug!("Submitted {} as {}", outcome.description, handle);

        self.confirm(&handle)
            .await
            .map_err(|e| (FailureStage::Confirmation, e))?;
        outcome.state = UnitState::Confirmed;
        log::info!("Confirmed {} ({} bytes)", outcome.description, outcome.payload_bytes);

        Ok(())
    }

    async fn confirm(&self, handle: &OperationHandle) -> Result<(), StorageError> {
        let timeout: Duration = self.options.confirmation_timeout;
        let confirmation: Confirmation =
            match tokio::time::timeout(timeout, self.client.await_confirmation(handle)).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(StorageError::ConfirmationTimeout {
                        handle: handle.to_string(),
                        seconds: timeout.as_secs(),
                    })
                }
            };

        match confirmation {
            Confirmation::Confirmed => Ok(()),
            Confirmation::Failed { reason } => Err(StorageError::Confirmation {
                handle: handle.to_string(),
                message: reason,
            }),
        }
    }
}

fn planned_outcome((index, unit): (usize, &WriteUnit)) -> UnitOutcome {
    UnitOutcome {
        unit_index: index,
        description: unit.describe(),
        paths: unit.paths().into_iter().map(String::from).collect(),
        payload_bytes: unit.payload_bytes(),
        state: UnitState::Planned,
        handle: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::diff::UploadCandidate;
    use crate::packer::plan_uploads;
    use crate::segment::BatchLimits;
    use crate::test_support::ScriptedStorage;
    use crate::types::{ContentEncoding, EncodedFile};

    fn target() -> SiteTarget {
        SiteTarget::new("0xsite", 1)
    }

    /// Batch[a, big-0], append[big-1], append[big-2].
    fn sample_plan() -> Plan {
        let file = |path: &str, size: usize| {
            UploadCandidate::new_file(EncodedFile {
                path: path.to_string(),
                content_type: "text/plain".to_string(),
                encoding: ContentEncoding::None,
                original_size: size as u64,
                encoded_size: size as u64,
                data: vec![7; size],
            })
        };
        plan_uploads(
            &[file("a", 50), file("big", 700)],
            &BatchLimits::new(100, 3).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_all_units_confirmed_in_order() {
        let store = ScriptedStorage::new();
        let plan: Plan = sample_plan();
        let report: ExecutionReport = TransactionExecutor::new(&store, target())
            .execute(&plan, None)
            .await;

        assert!(report.is_success());
        assert_eq!(report.confirmed_count(), 3);
        assert_eq!(report.confirmed_bytes(), 750);
        assert_eq!(
            store.submitted(),
            vec!["batch[a, big]", "append[big 2/3]", "append[big 3/3]"]
        );
        assert_eq!(report.outcomes[2].handle, Some(OperationHandle("0x0003".into())));
    }

    #[tokio::test]
    async fn test_simulation_failure_submits_nothing() {
        let store = ScriptedStorage::new().with_simulate_failure(
            0,
            StorageError::Precondition {
                message: "version locked".into(),
            },
        );
        let report: ExecutionReport = TransactionExecutor::new(&store, target())
            .execute(&sample_plan(), None)
            .await;

        assert!(store.submitted().is_empty());
        let failure: UnitFailure = report.failure.clone().unwrap();
        assert_eq!(failure.unit_index, 0);
        assert_eq!(failure.stage, FailureStage::Simulation);
        assert_eq!(failure.paths, vec!["a", "big"]);
        assert_eq!(report.outcomes[0].state, UnitState::Failed);
        assert_eq!(report.outcomes[1].state, UnitState::Planned);
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn test_later_simulation_failure_keeps_earlier_units() {
        let store = ScriptedStorage::new().with_simulate_failure(
            1,
            StorageError::Precondition {
                message: "version locked".into(),
            },
        );
        let report: ExecutionReport = TransactionExecutor::new(&store, target())
            .execute(&sample_plan(), None)
            .await;

        assert_eq!(store.submitted(), vec!["batch[a, big]"]);
        assert_eq!(report.outcomes[0].state, UnitState::Confirmed);
        assert_eq!(report.failure.unwrap().unit_index, 1);
    }

    #[tokio::test]
    async fn test_submission_failure_stops_run() {
        let store = ScriptedStorage::new().with_submit_failure(
            1,
            StorageError::Submission {
                message: "nonce too low".into(),
            },
        );
        let report: ExecutionReport = TransactionExecutor::new(&store, target())
            .execute(&sample_plan(), None)
            .await;

        let failure: UnitFailure = report.failure.clone().unwrap();
        assert_eq!(failure.unit_index, 1);
        assert_eq!(failure.stage, FailureStage::Submission);
        assert!(matches!(failure.error, StorageError::Submission { .. }));
        assert_eq!(store.submitted(), vec!["batch[a, big]"]);
        assert_eq!(store.simulation_count(), 2);
        assert_eq!(report.outcomes[0].state, UnitState::Confirmed);
        assert_eq!(report.outcomes[1].state, UnitState::Failed);
        assert_eq!(report.outcomes[1].handle, None);
        assert_eq!(report.outcomes[2].state, UnitState::Planned);
    }

    #[tokio::test]
    async fn test_confirmation_failure_stops_run() {
        let store = ScriptedStorage::new().with_confirmations(vec![
            Confirmation::Confirmed,
            Confirmation::Failed {
                reason: "reverted".into(),
            },
        ]);
        let report: ExecutionReport = TransactionExecutor::new(&store, target())
            .execute(&sample_plan(), None)
            .await;

        assert_eq!(store.submitted().len(), 2);
        let failure: UnitFailure = report.failure.unwrap();
        assert_eq!(failure.stage, FailureStage::Confirmation);
        assert_eq!(failure.description, "append[big 2/3]");
        assert!(matches!(failure.error, StorageError::Confirmation { .. }));
        assert_eq!(report.outcomes[1].state, UnitState::Failed);
        assert_eq!(report.outcomes[2].state, UnitState::Planned);
    }

    #[tokio::test]
    async fn test_confirmation_timeout_is_failure() {
        let store = ScriptedStorage::new().with_confirmation_delay(Duration::from_millis(200));
        let report: ExecutionReport = TransactionExecutor::new(&store, target())
            .with_options(
                ExecutorOptions::new().with_confirmation_timeout(Duration::from_millis(10)),
            )
            .execute(&sample_plan(), None)
            .await;

        let failure: UnitFailure = report.failure.unwrap();
        assert_eq!(failure.unit_index, 0);
        assert!(matches!(failure.error, StorageError::ConfirmationTimeout { .. }));
        assert_eq!(store.submitted().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_before_first_unit() {
        let store = ScriptedStorage::new();
        let stop = |_: &ExecutionProgress| false;
        let report: ExecutionReport = TransactionExecutor::new(&store, target())
            .execute(&sample_plan(), Some(&stop))
            .await;

        assert!(report.cancelled);
        assert!(store.submitted().is_empty());
        assert!(report.outcomes.iter().all(|o| o.state == UnitState::Cancelled));
        assert!(report.failure.is_none());
    }

    #[tokio::test]
    async fn test_cancel_between_units() {
        let store = ScriptedStorage::new();
        let seen = AtomicUsize::new(0);
        let stop_after_one = |p: &ExecutionProgress| {
            seen.fetch_add(1, Ordering::SeqCst);
            p.unit_index < 1
        };
        let report: ExecutionReport = TransactionExecutor::new(&store, target())
            .execute(&sample_plan(), Some(&stop_after_one))
            .await;

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(store.submitted().len(), 1);
        assert_eq!(report.outcomes[0].state, UnitState::Confirmed);
        assert_eq!(report.outcomes[1].state, UnitState::Cancelled);
    }

    #[tokio::test]
    async fn test_empty_plan_succeeds() {
        let store = ScriptedStorage::new();
        let report: ExecutionReport = TransactionExecutor::new(&store, target())
            .execute(&Plan::default(), None)
            .await;
        assert!(report.is_success());
        assert!(report.outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_report_serializes() {
        let store = ScriptedStorage::new().with_simulate_failure(
            0,
            StorageError::Precondition {
                message: "version locked".into(),
            },
        );
        let report: ExecutionReport = TransactionExecutor::new(&store, target())
            .execute(&sample_plan(), None)
            .await;

        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["failure"]["stage"], "Simulation");
        assert_eq!(
            json["failure"]["error"],
            "Precondition failed: version locked"
        );
    }
}
