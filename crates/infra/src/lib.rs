//! Infrastructure layer: job storage, lifecycle commands, background workers.

pub mod jobs;
