//! Job storage implementations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use eduadmin_core::JobId;

use super::query::JobFilter;
use super::types::{Job, JobStatus};

/// Job store abstraction.
///
/// `replace` is the only primitive that overwrites a stored record; every
/// lifecycle change is a read-modify-write expressed through `update`.
pub trait JobStore: Send + Sync {
    /// Enqueue a new job.
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError>;

    /// Allocate the next free sequential id (`JOB-000001`, ...).
    fn next_id(&self) -> Result<JobId, JobStoreError>;

    /// Get a job by ID.
    fn get(&self, job_id: &JobId) -> Result<Job, JobStoreError>;

    /// Overwrite the stored record with the same `job_id`.
    fn replace(&self, job: Job) -> Result<(), JobStoreError>;

    /// List jobs matching `filter` in insertion order.
    fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, JobStoreError>;

    /// Apply `f` to the current record and store the result.
    ///
    /// Implementations that allow concurrent callers must not let two
    /// updates of the same job interleave. The default is only suitable for
    /// single-threaded stores.
    fn update(&self, job_id: &JobId, f: &mut dyn FnMut(&mut Job)) -> Result<Job, JobStoreError> {
        let mut job = self.get(job_id)?;
        f(&mut job);
        self.replace(job.clone())?;
        Ok(job)
    }

    /// Get job statistics.
    fn stats(&self) -> Result<JobStats, JobStoreError> {
        let mut stats = JobStats::default();
        for job in self.list(&JobFilter::all())? {
            stats.record(job.status);
        }
        Ok(stats)
    }
}

/// Job store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job already exists: {0}")]
    AlreadyExists(JobId),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Job counts per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct JobStats {
    pub pending: usize,
    pub running: usize,
    pub failed: usize,
    pub completed: usize,
    pub total: usize,
}

impl JobStats {
    fn record(&mut self, status: JobStatus) {
        match status {
            JobStatus::Pending => self.pending += 1,
            JobStatus::Running => self.running += 1,
            JobStatus::Failed => self.failed += 1,
            JobStatus::Completed => self.completed += 1,
        }
        self.total += 1;
    }
}

#[derive(Debug, Default)]
struct Inner {
    jobs: HashMap<JobId, Job>,
    /// Insertion order; ids are never removed.
    order: Vec<JobId>,
}

impl Inner {
    /// Overwrite an existing record. Every write after enqueue lands here.
    fn replace_locked(&mut self, job: Job) -> Result<(), JobStoreError> {
        match self.jobs.get_mut(&job.job_id) {
            Some(slot) => {
                *slot = job;
                Ok(())
            }
            None => Err(JobStoreError::NotFound(job.job_id)),
        }
    }
}

/// In-memory job store for tests/dev.
#[derive(Debug)]
pub struct InMemoryJobStore {
    inner: RwLock<Inner>,
    seq: AtomicU64,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            seq: AtomicU64::new(0),
        }
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn poisoned() -> JobStoreError {
        JobStoreError::Storage("job store lock poisoned".to_string())
    }
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore for InMemoryJobStore {
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError> {
        let mut inner = self.inner.write().map_err(|_| Self::poisoned())?;
        if inner.jobs.contains_key(&job.job_id) {
            return Err(JobStoreError::AlreadyExists(job.job_id));
        }
        let id = job.job_id.clone();
        inner.order.push(id.clone());
        inner.jobs.insert(id.clone(), job);
        Ok(id)
    }

    fn next_id(&self) -> Result<JobId, JobStoreError> {
        let inner = self.inner.read().map_err(|_| Self::poisoned())?;
        loop {
            let id = JobId::sequential(self.seq.fetch_add(1, Ordering::Relaxed) + 1);
            if !inner.jobs.contains_key(&id) {
                return Ok(id);
            }
        }
    }

    fn get(&self, job_id: &JobId) -> Result<Job, JobStoreError> {
        let inner = self.inner.read().map_err(|_| Self::poisoned())?;
        inner
            .jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobStoreError::NotFound(job_id.clone()))
    }

    fn replace(&self, job: Job) -> Result<(), JobStoreError> {
        let mut inner = self.inner.write().map_err(|_| Self::poisoned())?;
        inner.replace_locked(job)
    }

    fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, JobStoreError> {
        let inner = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.jobs.get(id))
            .filter(|j| filter.matches(j))
            .cloned()
            .collect())
    }

    fn update(&self, job_id: &JobId, f: &mut dyn FnMut(&mut Job)) -> Result<Job, JobStoreError> {
        // Held for the whole read-modify-write.
        let mut inner = self.inner.write().map_err(|_| Self::poisoned())?;
        let mut job = inner
            .jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobStoreError::NotFound(job_id.clone()))?;

        f(&mut job);
        job.job_id = job_id.clone();
        inner.replace_locked(job.clone())?;
        Ok(job)
    }
}

impl JobStore for Arc<InMemoryJobStore> {
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError> {
        (**self).enqueue(job)
    }

    fn next_id(&self) -> Result<JobId, JobStoreError> {
        (**self).next_id()
    }

    fn get(&self, job_id: &JobId) -> Result<Job, JobStoreError> {
        (**self).get(job_id)
    }

    fn replace(&self, job: Job) -> Result<(), JobStoreError> {
        (**self).replace(job)
    }

    fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, JobStoreError> {
        (**self).list(filter)
    }

    fn update(&self, job_id: &JobId, f: &mut dyn FnMut(&mut Job)) -> Result<Job, JobStoreError> {
        (**self).update(job_id, f)
    }

    fn stats(&self) -> Result<JobStats, JobStoreError> {
        (**self).stats()
    }
}
