//! Worker simulator: advances jobs pending → running → completed/failed on a tick.

use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::outcome::{Outcome, OutcomePolicy};
use super::query::JobFilter;
use super::store::{JobStore, JobStoreError};
use super::types::{Job, JobStatus};

/// Simulator configuration.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Time between ticks
    pub tick_interval: Duration,
    /// Upper bound on jobs in `running` after a tick's start phase
    pub max_running: usize,
    /// Put failed attempts with budget left straight back to `pending`
    pub auto_retry: bool,
    /// Name for logging
    pub name: String,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(1500),
            max_running: 4,
            auto_retry: false,
            name: "worker-simulator".to_string(),
        }
    }
}

impl SimulatorConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_max_running(mut self, max: usize) -> Self {
        self.max_running = max;
        self
    }

    pub fn with_auto_retry(mut self, auto_retry: bool) -> Self {
        self.auto_retry = auto_retry;
        self
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub started: usize,
    pub completed: usize,
    pub failed: usize,
    /// Failed attempts sent back to `pending` (auto retry)
    pub requeued: usize,
    /// Pending jobs left alone because their attempts are used up
    pub skipped_exhausted: usize,
}

/// Cumulative statistics across ticks.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulatorStats {
    pub ticks: u64,
    pub jobs_started: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub jobs_requeued: u64,
    pub tick_errors: u64,
    pub uptime_secs: u64,
}

impl SimulatorStats {
    fn absorb(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.jobs_started += report.started as u64;
        self.jobs_completed += report.completed as u64;
        self.jobs_failed += report.failed as u64;
        self.jobs_requeued += report.requeued as u64;
    }
}

/// Handle to control a running simulator.
#[derive(Debug)]
pub struct SimulatorHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    stats: Arc<Mutex<SimulatorStats>>,
}

impl SimulatorHandle {
    /// Request graceful shutdown and wait for the loop to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }

    /// Get current simulator statistics.
    pub fn stats(&self) -> SimulatorStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

/// Stands in for a worker fleet.
///
/// Each [`tick`](WorkerSimulator::tick) first resolves jobs that were already
/// running, then starts pending ones, so a job always spends at least one
/// tick boundary in `running`. Writes go through [`JobStore::update`] and only
/// apply if the job is still in the status the simulator read; an operator
/// command that landed in between wins.
pub struct WorkerSimulator<S: JobStore, P: OutcomePolicy> {
    store: S,
    policy: P,
    config: SimulatorConfig,
}

impl<S: JobStore + 'static, P: OutcomePolicy + 'static> WorkerSimulator<S, P> {
    pub fn new(store: S, policy: P, config: SimulatorConfig) -> Self {
        Self {
            store,
            policy,
            config,
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Run one step synchronously.
    pub fn tick(&mut self) -> Result<TickReport, JobStoreError> {
        let mut report = TickReport::default();
        self.resolve_running(&mut report)?;
        self.start_pending(&mut report)?;

        if report != TickReport::default() {
            debug!(
                simulator = %self.config.name,
                started = report.started,
                completed = report.completed,
                failed = report.failed,
                requeued = report.requeued,
                "tick"
            );
        }
        Ok(report)
    }

    fn resolve_running(&mut self, report: &mut TickReport) -> Result<(), JobStoreError> {
        let running = self.store.list(&JobFilter::all().with_status(JobStatus::Running))?;

        for job in running {
            let outcome = self.policy.decide(&job);
            let auto_retry = self.config.auto_retry;
            let mut applied = None;

            let result = self.store.update(&job.job_id, &mut |current: &mut Job| {
                if current.status != JobStatus::Running {
                    return;
                }
                let now = Utc::now();
                applied = Some(match &outcome {
                    Outcome::Succeed(result) => {
                        current.mark_completed(now, result.clone());
                        JobStatus::Completed
                    }
                    Outcome::Fail(_) if auto_retry && !current.is_exhausted() => {
                        current.mark_requeued(now);
                        JobStatus::Pending
                    }
                    Outcome::Fail(err) => {
                        current.mark_failed(now, err.clone());
                        JobStatus::Failed
                    }
                });
            });

            match (result, applied) {
                (Ok(updated), Some(status)) => {
                    match status {
                        JobStatus::Completed => report.completed += 1,
                        JobStatus::Pending => report.requeued += 1,
                        _ => report.failed += 1,
                    }
                    debug!(
                        job_id = %updated.job_id,
                        status = %updated.status,
                        attempts = updated.attempts,
                        error = ?updated.error,
                        "job attempt resolved"
                    );
                }
                (Ok(_), None) => {
                    debug!(job_id = %job.job_id, "job changed by operator before resolution");
                }
                (Err(JobStoreError::NotFound(id)), _) => {
                    warn!(job_id = %id, "running job vanished from store");
                }
                (Err(e), _) => return Err(e),
            }
        }
        Ok(())
    }

    fn start_pending(&mut self, report: &mut TickReport) -> Result<(), JobStoreError> {
        let mut running = self
            .store
            .list(&JobFilter::all().with_status(JobStatus::Running))?
            .len();
        if running >= self.config.max_running {
            return Ok(());
        }

        let pending = self.store.list(&JobFilter::all().with_status(JobStatus::Pending))?;
        for job in pending {
            if running >= self.config.max_running {
                break;
            }
            if job.is_exhausted() {
                report.skipped_exhausted += 1;
                debug!(job_id = %job.job_id, attempts = job.attempts, "pending job has no attempts left");
                continue;
            }

            let mut started = false;
            let result = self.store.update(&job.job_id, &mut |current: &mut Job| {
                if current.status == JobStatus::Pending && !current.is_exhausted() {
                    current.mark_running(Utc::now());
                    started = true;
                }
            });

            match result {
                Ok(updated) if started => {
                    running += 1;
                    report.started += 1;
                    debug!(job_id = %updated.job_id, attempt = updated.attempts, "job started");
                }
                Ok(_) => {}
                Err(JobStoreError::NotFound(id)) => {
                    warn!(job_id = %id, "pending job vanished from store");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Spawn the simulator loop in a background thread.
    pub fn spawn(self) -> std::io::Result<SimulatorHandle>
    where
        S: Send,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let stats = Arc::new(Mutex::new(SimulatorStats::default()));
        let stats_clone = stats.clone();

        let join = thread::Builder::new()
            .name(self.config.name.clone())
            .spawn(move || simulator_loop(self, shutdown_rx, stats_clone))?;

        Ok(SimulatorHandle {
            shutdown: shutdown_tx,
            join: Some(join),
            stats,
        })
    }
}

fn simulator_loop<S, P>(
    mut sim: WorkerSimulator<S, P>,
    shutdown_rx: mpsc::Receiver<()>,
    stats: Arc<Mutex<SimulatorStats>>,
) where
    S: JobStore + 'static,
    P: OutcomePolicy + 'static,
{
    let name = sim.config.name.clone();
    let interval = sim.config.tick_interval;
    info!(simulator = %name, interval_ms = interval.as_millis() as u64, "worker simulator started");
    let start_time = Instant::now();

    loop {
        match shutdown_rx.recv_timeout(interval) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
        }

        let result = sim.tick();

        if let Ok(mut s) = stats.lock() {
            s.uptime_secs = start_time.elapsed().as_secs();
            match &result {
                Ok(report) => s.absorb(report),
                Err(_) => s.tick_errors += 1,
            }
        }

        if let Err(e) = result {
            error!(simulator = %name, error = %e, "simulator tick failed");
        }
    }

    info!(simulator = %name, "worker simulator stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::operator::LifecycleOperator;
    use crate::jobs::outcome::{AlwaysFail, AlwaysSucceed, WeightedRandom};
    use crate::jobs::store::InMemoryJobStore;
    use crate::jobs::types::JobType;
    use eduadmin_core::JobId;

    fn store_with_pending(n: u64, max_attempts: u32) -> Arc<InMemoryJobStore> {
        let store = InMemoryJobStore::arc();
        for i in 1..=n {
            let job = Job::new(JobId::sequential(i), JobType::Email, serde_json::json!({"i": i}))
                .with_max_attempts(max_attempts);
            store.enqueue(job).unwrap();
        }
        store
    }

    fn status_of(store: &InMemoryJobStore, n: u64) -> JobStatus {
        store.get(&JobId::sequential(n)).unwrap().status
    }

    #[test]
    fn pending_passes_through_running_before_completing() {
        let store = store_with_pending(2, 3);
        let mut sim = WorkerSimulator::new(store.clone(), AlwaysSucceed, SimulatorConfig::default());

        let first = sim.tick().unwrap();
        assert_eq!(first.started, 2);
        assert_eq!(first.completed, 0);
        let job = store.get(&JobId::sequential(1)).unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.attempts, 1);
        assert!(job.started_at.is_some());
        assert!(job.finished_at.is_none());

        let second = sim.tick().unwrap();
        assert_eq!(second.completed, 2);
        let job = store.get(&JobId::sequential(1)).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.finished_at.is_some());
        assert!(job.result.is_some());
        assert!(job.error.is_none());
    }

    #[test]
    fn max_running_limits_starts() {
        let store = store_with_pending(5, 3);
        let config = SimulatorConfig::default().with_max_running(2);
        let mut sim = WorkerSimulator::new(store.clone(), AlwaysSucceed, config);

        assert_eq!(sim.tick().unwrap().started, 2);
        assert_eq!(status_of(&store, 3), JobStatus::Pending);

        // Two resolve, two more start.
        let report = sim.tick().unwrap();
        assert_eq!(report.completed, 2);
        assert_eq!(report.started, 2);
        assert_eq!(status_of(&store, 3), JobStatus::Running);
    }

    #[test]
    fn failure_lands_in_failed_with_error() {
        let store = store_with_pending(1, 3);
        let mut sim = WorkerSimulator::new(store.clone(), AlwaysFail("disk full".into()), SimulatorConfig::default());

        sim.tick().unwrap();
        let report = sim.tick().unwrap();
        assert_eq!(report.failed, 1);

        let job = store.get(&JobId::sequential(1)).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("disk full"));
        assert!(job.finished_at.is_some());
        assert!(job.result.is_none());

        // Failed jobs are not picked up again without an operator.
        assert_eq!(sim.tick().unwrap(), TickReport::default());
    }

    #[test]
    fn auto_retry_stops_at_max_attempts() {
        let store = store_with_pending(1, 2);
        let config = SimulatorConfig::default().with_auto_retry(true);
        let mut sim = WorkerSimulator::new(store.clone(), AlwaysFail("boom".into()), config);

        sim.tick().unwrap(); // start, attempt 1
        let r = sim.tick().unwrap(); // fail -> pending, start attempt 2
        assert_eq!(r.requeued, 1);
        assert_eq!(r.started, 1);
        assert_eq!(store.get(&JobId::sequential(1)).unwrap().attempts, 2);

        let r = sim.tick().unwrap(); // exhausted -> failed
        assert_eq!(r.failed, 1);
        let job = store.get(&JobId::sequential(1)).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.attempts, 2);

        assert_eq!(sim.tick().unwrap(), TickReport::default());
    }

    #[test]
    fn exhausted_pending_jobs_are_skipped_until_retried() {
        let store = store_with_pending(1, 1);
        let op = LifecycleOperator::new(store.clone());
        let mut sim = WorkerSimulator::new(store.clone(), AlwaysFail("x".into()), SimulatorConfig::default());

        sim.tick().unwrap();
        sim.tick().unwrap();
        op.requeue(&JobId::sequential(1)).unwrap();

        let r = sim.tick().unwrap();
        assert_eq!(r.skipped_exhausted, 1);
        assert_eq!(status_of(&store, 1), JobStatus::Pending);
        assert_eq!(store.get(&JobId::sequential(1)).unwrap().attempts, 1);

        op.retry(&JobId::sequential(1)).unwrap();
        assert_eq!(sim.tick().unwrap().started, 1);
    }

    #[test]
    fn operator_cancel_of_running_job_is_kept() {
        let store = store_with_pending(1, 3);
        let op = LifecycleOperator::new(store.clone());
        let mut sim = WorkerSimulator::new(store.clone(), AlwaysSucceed, SimulatorConfig::default());

        sim.tick().unwrap();
        op.cancel(&JobId::sequential(1)).unwrap();

        let r = sim.tick().unwrap();
        assert_eq!(r.completed, 0);
        let job = store.get(&JobId::sequential(1)).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some(crate::jobs::types::CANCELLED_BY_USER));
    }

    #[test]
    fn attempts_never_exceed_max_under_random_outcomes() {
        let store = store_with_pending(20, 3);
        let op = LifecycleOperator::new(store.clone());
        let config = SimulatorConfig::default().with_max_running(6).with_auto_retry(true);
        let mut sim = WorkerSimulator::new(store.clone(), WeightedRandom::seeded(0.3, 7), config);

        for round in 0..60 {
            let before = store.list(&JobFilter::all()).unwrap();
            sim.tick().unwrap();
            if round % 10 == 9 {
                op.retry_all_failed().unwrap();
            }
            for (old, new) in before.iter().zip(store.list(&JobFilter::all()).unwrap()) {
                assert!(new.attempts <= new.max_attempts);
                if old.status == JobStatus::Pending {
                    assert!(!new.status.is_outcome(), "{} skipped running", new.job_id);
                }
            }
        }
    }

    #[test]
    fn spawned_loop_progresses_and_shuts_down() {
        let store = store_with_pending(3, 3);
        let config = SimulatorConfig::default().with_tick_interval(Duration::from_millis(5));
        let handle = WorkerSimulator::new(store.clone(), AlwaysSucceed, config)
            .spawn()
            .unwrap();

        for _ in 0..200 {
            if store.stats().unwrap().completed == 3 {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }

        let stats = handle.stats();
        handle.shutdown();
        assert_eq!(store.stats().unwrap().completed, 3);
        assert!(stats.ticks >= 1);
    }
}
