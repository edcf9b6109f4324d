//! Types for the admission scheduler.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by a [`SchedulerHandle`](super::SchedulerHandle).
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The scheduler loop has exited.
    #[error("scheduler is not running")]
    Stopped,
}

/// Snapshot of the scheduler's job list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    /// Jobs waiting for admission.
    pub queued: usize,
    /// Jobs currently running.
    pub running: usize,
    /// Concurrency ceiling.
    pub max_running: usize,
}
