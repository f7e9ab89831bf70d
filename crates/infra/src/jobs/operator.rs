//! Operator-triggered lifecycle commands and bulk remediation.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use eduadmin_core::JobId;

use super::query::JobFilter;
use super::store::{JobStore, JobStoreError};
use super::transition::{self, JobCommand, TransitionPolicy, TransitionRejected};
use super::types::{CANCELLED_BY_USER, Job, JobStatus};

/// Lifecycle command error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperatorError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job {job_id}: {rejected}")]
    Rejected {
        job_id: JobId,
        rejected: TransitionRejected,
    },
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<JobStoreError> for OperatorError {
    fn from(value: JobStoreError) -> Self {
        match value {
            JobStoreError::NotFound(id) => OperatorError::NotFound(id),
            other => OperatorError::Storage(other.to_string()),
        }
    }
}

/// Per-id result of a bulk command.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOutcome {
    pub job_id: JobId,
    pub result: Result<Job, OperatorError>,
}

impl BulkOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Counts over a bulk command's outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkSummary {
    pub requested: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BulkSummary {
    pub fn of(outcomes: &[BulkOutcome]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
        Self {
            requested: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
        }
    }
}

/// Jobs that were updated, in outcome order.
pub fn succeeded(outcomes: &[BulkOutcome]) -> Vec<&Job> {
    outcomes.iter().filter_map(|o| o.result.as_ref().ok()).collect()
}

/// Ids that could not be updated, with the reason.
pub fn failures(outcomes: &[BulkOutcome]) -> Vec<(&JobId, &OperatorError)> {
    outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().err().map(|e| (&o.job_id, e)))
        .collect()
}

/// Applies retry/cancel/requeue to stored jobs.
///
/// Every command is a single read-modify-write through [`JobStore::update`].
/// Under [`TransitionPolicy::Permissive`] commands never look at the current
/// status.
#[derive(Debug, Clone)]
pub struct LifecycleOperator<S: JobStore> {
    store: S,
    policy: TransitionPolicy,
}

impl<S: JobStore> LifecycleOperator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            policy: TransitionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Back to `pending` with a fresh attempt budget.
    ///
    /// `enqueued_at` is left alone.
    pub fn retry(&self, job_id: &JobId) -> Result<Job, OperatorError> {
        self.apply(job_id, JobCommand::Retry, |job| {
            job.status = JobStatus::Pending;
            job.attempts = 0;
            job.error = None;
            job.result = None;
            job.finished_at = None;
        })
    }

    /// Relabel as failed. Simulated work in progress is not interrupted.
    pub fn cancel(&self, job_id: &JobId) -> Result<Job, OperatorError> {
        self.apply(job_id, JobCommand::Cancel, |job| {
            let now = Utc::now();
            job.status = JobStatus::Failed;
            job.error = Some(CANCELLED_BY_USER.to_string());
            job.result = None;
            job.finished_at.get_or_insert(now);
        })
    }

    /// Back to `pending` with a new `enqueued_at`; attempts are kept.
    pub fn requeue(&self, job_id: &JobId) -> Result<Job, OperatorError> {
        self.apply(job_id, JobCommand::Requeue, |job| job.mark_requeued(Utc::now()))
    }

    /// Retry each id independently; one failure never stops the rest.
    ///
    /// Returns one outcome per input id, in input order.
    pub fn bulk_retry(&self, job_ids: &[JobId]) -> Vec<BulkOutcome> {
        let outcomes: Vec<BulkOutcome> = job_ids
            .iter()
            .map(|id| BulkOutcome {
                job_id: id.clone(),
                result: self.retry(id),
            })
            .collect();

        let summary = BulkSummary::of(&outcomes);
        info!(
            requested = summary.requested,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "bulk retry finished"
        );
        outcomes
    }

    /// Retry every job that is `failed` right now.
    pub fn retry_all_failed(&self) -> Result<Vec<BulkOutcome>, OperatorError> {
        let ids: Vec<JobId> = self
            .store
            .list(&JobFilter::all().with_status(JobStatus::Failed))?
            .into_iter()
            .map(|j| j.job_id)
            .collect();

        debug!(count = ids.len(), "retrying all failed jobs");
        Ok(self.bulk_retry(&ids))
    }

    fn apply<F>(&self, job_id: &JobId, command: JobCommand, mut effect: F) -> Result<Job, OperatorError>
    where
        F: FnMut(&mut Job),
    {
        let policy = self.policy;
        let mut rejected: Option<TransitionRejected> = None;
        let mut from = None;

        let updated = self
            .store
            .update(job_id, &mut |job| {
                from = Some(job.status);
                match transition::check(policy, job.status, command) {
                    Ok(_) => effect(job),
                    Err(r) => rejected = Some(r),
                }
            })
            .map_err(|e| {
                warn!(job_id = %job_id, command = %command, error = %e, "job command failed");
                OperatorError::from(e)
            })?;

        if let Some(rejected) = rejected {
            warn!(job_id = %job_id, command = %command, from = %rejected.from, "job command rejected");
            return Err(OperatorError::Rejected {
                job_id: job_id.clone(),
                rejected,
            });
        }

        info!(
            job_id = %job_id,
            command = %command,
            from = ?from,
            to = %updated.status,
            attempts = updated.attempts,
            "job command applied"
        );
        Ok(updated)
    }
}
