//! Core job types.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use eduadmin_core::{DomainError, JobId};

/// Error text written by an operator cancel.
pub const CANCELLED_BY_USER: &str = "Cancelled by user";

/// Default attempt ceiling for newly created jobs.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Kind of work a job represents. Closed set, immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    Email,
    Push,
    VideoProcessing,
    Export,
    Backup,
}

impl JobType {
    pub const ALL: [JobType; 5] = [
        JobType::Email,
        JobType::Push,
        JobType::VideoProcessing,
        JobType::Export,
        JobType::Backup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Email => "email",
            JobType::Push => "push",
            JobType::VideoProcessing => "video-processing",
            JobType::Export => "export",
            JobType::Backup => "backup",
        }
    }
}

impl core::fmt::Display for JobType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation(format!("unknown job type: {s}")))
    }
}

/// Job execution status.
///
/// `completed` and `failed` are rest states, not hard-terminal: an operator
/// can move a job back to `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Queued, waiting to be picked up
    Pending,
    /// Currently being executed
    Running,
    /// Last attempt failed (or was cancelled)
    Failed,
    /// Last attempt succeeded
    Completed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Pending,
        JobStatus::Running,
        JobStatus::Failed,
        JobStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Failed => "failed",
            JobStatus::Completed => "completed",
        }
    }

    /// `completed` or `failed`.
    pub fn is_outcome(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl core::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation(format!("unknown job status: {s}")))
    }
}

/// A background job record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: JobId,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub status: JobStatus,
    /// Execution attempts so far, never above `max_attempts`
    pub attempts: u32,
    pub max_attempts: u32,
    /// Last entry into `pending`
    pub enqueued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Opaque description of the unit of work
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl Job {
    /// Create a new pending job with zero attempts.
    pub fn new(job_id: JobId, job_type: JobType, payload: serde_json::Value) -> Self {
        Self {
            job_id,
            job_type,
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            enqueued_at: Utc::now(),
            started_at: None,
            finished_at: None,
            payload,
            error: None,
            result: None,
        }
    }

    /// Set the attempt ceiling (at least 1).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.attempts = self.attempts.min(self.max_attempts);
        self
    }

    pub fn enqueued_at(mut self, at: DateTime<Utc>) -> Self {
        self.enqueued_at = at;
        self
    }

    /// No attempts left before an operator retry.
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Mark job as running (new attempt).
    ///
    /// Callers must check [`Job::is_exhausted`] first; the counter saturates at
    /// `max_attempts`.
    pub fn mark_running(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Running;
        self.attempts = (self.attempts + 1).min(self.max_attempts);
        self.started_at = Some(now);
        self.finished_at = None;
        self.error = None;
        self.result = None;
    }

    /// Mark job as completed.
    pub fn mark_completed(&mut self, now: DateTime<Utc>, result: serde_json::Value) {
        self.status = JobStatus::Completed;
        self.finished_at = Some(now);
        self.error = None;
        self.result = Some(result);
    }

    /// Mark job as failed.
    pub fn mark_failed(&mut self, now: DateTime<Utc>, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.finished_at = Some(now);
        self.error = Some(error.into());
        self.result = None;
    }

    /// Return to `pending` with a fresh enqueue timestamp.
    ///
    /// The timestamp never moves backwards, even if the wall clock does.
    pub fn mark_requeued(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Pending;
        self.enqueued_at = now.max(self.enqueued_at);
        self.finished_at = None;
        self.error = None;
        self.result = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new(JobId::sequential(1), JobType::Email, serde_json::json!({"to": "a@b.c"}))
    }

    #[test]
    fn new_job_is_pending_with_zero_attempts() {
        let job = job();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempts, 0);
        assert_eq!(job.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert!(job.started_at.is_none());
        assert!(job.finished_at.is_none());
    }

    #[test]
    fn max_attempts_is_at_least_one() {
        assert_eq!(job().with_max_attempts(0).max_attempts, 1);
    }

    #[test]
    fn job_lifecycle() {
        let mut job = job().with_max_attempts(2);
        let now = Utc::now();

        job.mark_running(now);
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.attempts, 1);
        assert_eq!(job.started_at, Some(now));

        job.mark_failed(now, "smtp timeout");
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("smtp timeout"));
        assert_eq!(job.finished_at, Some(now));

        job.mark_running(now);
        assert_eq!(job.attempts, 2);
        assert!(job.error.is_none());
        assert!(job.finished_at.is_none());
        assert!(job.is_exhausted());

        job.mark_completed(now, serde_json::json!({"delivered": true}));
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.result.is_some());
    }

    #[test]
    fn attempts_saturate_at_ceiling() {
        let mut job = job().with_max_attempts(1);
        job.mark_running(Utc::now());
        job.mark_running(Utc::now());
        assert_eq!(job.attempts, 1);
    }

    #[test]
    fn requeue_never_moves_enqueued_at_backwards() {
        let later = Utc::now() + chrono::Duration::hours(1);
        let mut job = job().enqueued_at(later);
        job.mark_requeued(Utc::now());
        assert_eq!(job.enqueued_at, later);
    }

    #[test]
    fn serializes_with_presentation_field_names() {
        let mut job = job();
        job.mark_failed(Utc::now(), "disk full");
        let v = serde_json::to_value(&job).unwrap();

        assert_eq!(v["jobId"], "JOB-000001");
        assert_eq!(v["type"], "email");
        assert_eq!(v["status"], "failed");
        assert_eq!(v["maxAttempts"], 3);
        assert_eq!(v["error"], "disk full");
        assert!(v.get("result").is_none());
        assert!(v.get("startedAt").is_none());
    }

    #[test]
    fn parses_type_and_status_names() {
        assert_eq!("video-processing".parse::<JobType>().unwrap(), JobType::VideoProcessing);
        assert_eq!("PENDING".parse::<JobStatus>().unwrap(), JobStatus::Pending);
        assert!("sms".parse::<JobType>().is_err());
        assert!("queued".parse::<JobStatus>().is_err());
    }
}
