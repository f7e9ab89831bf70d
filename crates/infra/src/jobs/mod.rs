//! Background job queue: record store, lifecycle commands, worker simulator.
//!
//! ## Design
//!
//! - Jobs move `pending → running → completed | failed`
//! - Operators can retry, cancel or requeue any job, singly or in bulk
//! - Bulk commands report per-id outcomes and never abort half way
//! - A timer-driven simulator stands in for real workers
//!
//! ## Components
//!
//! - `Job`: the job record and its status helpers
//! - `JobStore`: the only place records are read and written
//! - `JobFilter` / `Page`: listing queries
//! - `LifecycleOperator`: retry / cancel / requeue / bulk retry
//! - `WorkerSimulator`: advances jobs on each tick, driven by an `OutcomePolicy`

pub mod operator;
pub mod outcome;
pub mod query;
pub mod seed;
pub mod simulator;
pub mod store;
pub mod transition;
pub mod types;

pub use operator::{BulkOutcome, BulkSummary, LifecycleOperator, OperatorError};
pub use outcome::{AlwaysFail, AlwaysSucceed, Outcome, OutcomePolicy, WeightedRandom};
pub use query::{JobFilter, JobPage, Page};
pub use seed::seed_jobs;
pub use simulator::{SimulatorConfig, SimulatorHandle, SimulatorStats, TickReport, WorkerSimulator};
pub use store::{InMemoryJobStore, JobStats, JobStore, JobStoreError};
pub use transition::{JobCommand, TransitionPolicy, TransitionRejected};
pub use types::{CANCELLED_BY_USER, Job, JobStatus, JobType};
