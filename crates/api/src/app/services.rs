use std::sync::Arc;

use eduadmin_core::JobId;
use eduadmin_infra::jobs::{
    BulkOutcome, InMemoryJobStore, Job, JobFilter, JobPage, JobStats, JobStore, JobStoreError,
    LifecycleOperator, OperatorError, Page, TransitionPolicy, query,
};

/// Store type shared by the HTTP layer and the worker simulator.
pub type SharedJobStore = Arc<InMemoryJobStore>;

/// Job console services: the query and command surface behind the routes.
///
/// Cheap to share behind an `Arc`; the store does its own locking.
#[derive(Debug, Clone)]
pub struct AppServices {
    store: SharedJobStore,
    operator: LifecycleOperator<SharedJobStore>,
}

impl AppServices {
    pub fn new(store: SharedJobStore, policy: TransitionPolicy) -> Self {
        let operator = LifecycleOperator::new(store.clone()).with_policy(policy);
        Self { store, operator }
    }

    pub fn store(&self) -> &SharedJobStore {
        &self.store
    }

    pub fn list(&self, filter: &JobFilter, page: Page) -> Result<JobPage, JobStoreError> {
        let jobs = self.store.list(filter)?;
        Ok(query::paginate(jobs, page))
    }

    pub fn get(&self, job_id: &JobId) -> Result<Job, JobStoreError> {
        self.store.get(job_id)
    }

    pub fn stats(&self) -> Result<JobStats, JobStoreError> {
        self.store.stats()
    }

    pub fn retry(&self, job_id: &JobId) -> Result<Job, OperatorError> {
        self.operator.retry(job_id)
    }

    pub fn cancel(&self, job_id: &JobId) -> Result<Job, OperatorError> {
        self.operator.cancel(job_id)
    }

    pub fn requeue(&self, job_id: &JobId) -> Result<Job, OperatorError> {
        self.operator.requeue(job_id)
    }

    pub fn bulk_retry(&self, job_ids: &[JobId]) -> Vec<BulkOutcome> {
        self.operator.bulk_retry(job_ids)
    }

    pub fn retry_all_failed(&self) -> Result<Vec<BulkOutcome>, OperatorError> {
        self.operator.retry_all_failed()
    }
}
