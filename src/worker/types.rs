use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::runtime::types::RuntimeError;
use crate::task::types::State;

/// Configuration for one worker's reconciliation loop.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub name: String,
    /// Capacity of the intent queue; submitters back off when it is full.
    pub queue_capacity: usize,
    /// Deadline applied to every runtime dispatch.
    pub dispatch_timeout: Duration,
}

impl WorkerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        WorkerConfig {
            name: name.into(),
            queue_capacity: 64,
            dispatch_timeout: Duration::from_secs(30),
        }
    }

    pub fn dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }
}

/// Errors produced while reconciling a single intent. None of these are fatal
/// to the loop; it keeps processing subsequent intents.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkerError {
    /// The desired state is unreachable from the persisted state. Rejected
    /// before any side effect, so resubmitting a corrected intent is safe.
    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition { from: State, to: State },

    /// A stop intent arrived for a task with no recorded runtime handle.
    #[error("task {0} has no runtime handle to stop")]
    MissingHandle(Uuid),

    /// The runtime could not start the workload; the task was persisted as
    /// failed.
    #[error("workload start failed: {0}")]
    StartFailed(RuntimeError),

    /// The runtime could not stop the workload. The record is left unchanged
    /// because the workload's real status is unverified.
    #[error("workload stop failed: {0}")]
    StopFailed(RuntimeError),

    /// A dispatch exceeded its deadline. Not retried.
    #[error("{action} dispatch timed out after {after:?}")]
    DispatchTimeout {
        action: &'static str,
        after: Duration,
    },

    /// Submission after worker shutdown.
    #[error("worker queue is closed")]
    QueueClosed,
}
