//! Deterministic mock jobs for dev servers and demos.

use chrono::{Duration, Utc};
use serde_json::json;

use super::store::{JobStore, JobStoreError};
use super::types::{Job, JobStatus, JobType};

const COURSES: [&str; 4] = ["spanish-a1", "french-b2", "japanese-n5", "german-a2"];
const RESOLUTIONS: [&str; 3] = ["480p", "720p", "1080p"];
const EXPORT_FORMATS: [&str; 2] = ["csv", "xlsx"];

/// Enqueue `count` mock jobs with mixed types and statuses.
///
/// The same `seed` always produces the same jobs (ids depend on the store's
/// allocator). Returns the enqueued records.
pub fn seed_jobs<S: JobStore + ?Sized>(
    store: &S,
    count: usize,
    seed: u64,
) -> Result<Vec<Job>, JobStoreError> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let base = Utc::now() - Duration::hours(2);
    let mut jobs = Vec::with_capacity(count);

    for i in 0..count {
        let job_type = JobType::ALL[rng.usize(..JobType::ALL.len())];
        let max_attempts = rng.u32(1..=5);
        let enqueued_at = base + Duration::seconds((i as i64) * 30);
        let mut job = Job::new(store.next_id()?, job_type, payload_for(job_type, &mut rng))
            .with_max_attempts(max_attempts)
            .enqueued_at(enqueued_at);

        let started = enqueued_at + Duration::seconds(rng.i64(1..20));
        match JobStatus::ALL[rng.usize(..JobStatus::ALL.len())] {
            JobStatus::Pending => {}
            JobStatus::Running => job.mark_running(started),
            JobStatus::Completed => {
                job.mark_running(started);
                job.mark_completed(started + Duration::seconds(rng.i64(1..90)), json!({"ok": true}));
            }
            JobStatus::Failed => {
                job.attempts = rng.u32(0..max_attempts);
                job.mark_running(started);
                job.mark_failed(started + Duration::seconds(rng.i64(1..90)), "Worker lost heartbeat");
            }
        }

        store.enqueue(job.clone())?;
        jobs.push(job);
    }

    Ok(jobs)
}

fn payload_for(job_type: JobType, rng: &mut fastrand::Rng) -> serde_json::Value {
    let course = COURSES[rng.usize(..COURSES.len())];
    match job_type {
        JobType::Email => json!({
            "template": "weekly-progress",
            "recipient": format!("learner{}@example.com", rng.u32(1..5000)),
        }),
        JobType::Push => json!({
            "campaign": "streak-reminder",
            "audience": rng.u32(100..20_000),
        }),
        JobType::VideoProcessing => json!({
            "lessonId": format!("{course}-lesson-{}", rng.u32(1..40)),
            "resolution": RESOLUTIONS[rng.usize(..RESOLUTIONS.len())],
        }),
        JobType::Export => json!({
            "report": "quiz-results",
            "course": course,
            "format": EXPORT_FORMATS[rng.usize(..EXPORT_FORMATS.len())],
        }),
        JobType::Backup => json!({
            "target": "content-db",
            "incremental": rng.bool(),
        }),
    }
}
