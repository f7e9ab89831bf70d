//! Operator command transition table.

use super::types::JobStatus;

/// Operator-issued lifecycle command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobCommand {
    Retry,
    Cancel,
    Requeue,
}

impl JobCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobCommand::Retry => "retry",
            JobCommand::Cancel => "cancel",
            JobCommand::Requeue => "requeue",
        }
    }

    /// Status the command moves a job into.
    pub fn target(&self) -> JobStatus {
        match self {
            JobCommand::Retry | JobCommand::Requeue => JobStatus::Pending,
            JobCommand::Cancel => JobStatus::Failed,
        }
    }
}

impl core::fmt::Display for JobCommand {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How operator commands treat the job's current status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransitionPolicy {
    /// Commands are unconditional setters.
    #[default]
    Permissive,
    /// Only the transitions in [`strict_allows`] are accepted.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {command} a job that is {from}")]
pub struct TransitionRejected {
    pub from: JobStatus,
    pub command: JobCommand,
}

/// Strict table: `retry`/`requeue` only from a rest state, `cancel` only
/// while the job is still queued or running.
pub fn strict_allows(from: JobStatus, command: JobCommand) -> bool {
    use JobStatus::*;
    match command {
        JobCommand::Retry | JobCommand::Requeue => matches!(from, Failed | Completed),
        JobCommand::Cancel => matches!(from, Pending | Running),
    }
}

/// Resolve `(current, command)` to the next status under `policy`.
pub fn check(
    policy: TransitionPolicy,
    from: JobStatus,
    command: JobCommand,
) -> Result<JobStatus, TransitionRejected> {
    match policy {
        TransitionPolicy::Permissive => Ok(command.target()),
        TransitionPolicy::Strict if strict_allows(from, command) => Ok(command.target()),
        TransitionPolicy::Strict => Err(TransitionRejected { from, command }),
    }
}
