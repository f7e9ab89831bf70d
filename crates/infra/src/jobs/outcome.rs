//! Outcome policies deciding how a simulated attempt ends.

use serde_json::json;

use super::types::{Job, JobType};

/// How a simulated attempt ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Attempt succeeded with an opaque result
    Succeed(serde_json::Value),
    /// Attempt failed with a human-readable error
    Fail(String),
}

/// Decides the outcome of a running job's current attempt.
pub trait OutcomePolicy: Send {
    fn decide(&mut self, job: &Job) -> Outcome;
}

impl<F> OutcomePolicy for F
where
    F: FnMut(&Job) -> Outcome + Send,
{
    fn decide(&mut self, job: &Job) -> Outcome {
        self(job)
    }
}

/// Every attempt succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysSucceed;

impl OutcomePolicy for AlwaysSucceed {
    fn decide(&mut self, job: &Job) -> Outcome {
        Outcome::Succeed(result_for(job))
    }
}

/// Every attempt fails with the same message.
#[derive(Debug, Clone)]
pub struct AlwaysFail(pub String);

impl OutcomePolicy for AlwaysFail {
    fn decide(&mut self, _job: &Job) -> Outcome {
        Outcome::Fail(self.0.clone())
    }
}

/// Succeeds with probability `success_rate`; failures pick a type-specific message.
#[derive(Debug, Clone)]
pub struct WeightedRandom {
    success_rate: f64,
    rng: fastrand::Rng,
}

impl WeightedRandom {
    pub const DEFAULT_SUCCESS_RATE: f64 = 0.8;

    pub fn new(success_rate: f64) -> Self {
        Self::with_rng(success_rate, fastrand::Rng::new())
    }

    /// Same seed, same sequence of outcomes.
    pub fn seeded(success_rate: f64, seed: u64) -> Self {
        Self::with_rng(success_rate, fastrand::Rng::with_seed(seed))
    }

    fn with_rng(success_rate: f64, rng: fastrand::Rng) -> Self {
        let success_rate = if success_rate.is_finite() {
            success_rate.clamp(0.0, 1.0)
        } else {
            Self::DEFAULT_SUCCESS_RATE
        };
        Self { success_rate, rng }
    }

    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }
}

impl Default for WeightedRandom {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SUCCESS_RATE)
    }
}

impl OutcomePolicy for WeightedRandom {
    fn decide(&mut self, job: &Job) -> Outcome {
        if self.rng.f64() < self.success_rate {
            return Outcome::Succeed(result_for(job));
        }
        let messages = failure_messages(job.job_type);
        Outcome::Fail(messages[self.rng.usize(..messages.len())].to_string())
    }
}

fn failure_messages(job_type: JobType) -> &'static [&'static str] {
    match job_type {
        JobType::Email => &["SMTP connection timed out", "Recipient mailbox unavailable"],
        JobType::Push => &["Device token expired", "Push gateway returned 503"],
        JobType::VideoProcessing => &["Transcoder crashed", "Unsupported codec"],
        JobType::Export => &["disk full", "Query exceeded time limit"],
        JobType::Backup => &["Snapshot lock held by another process", "Storage quota exceeded"],
    }
}

fn result_for(job: &Job) -> serde_json::Value {
    json!({
        "type": job.job_type.as_str(),
        "attempt": job.attempts,
        "ok": true,
    })
}
