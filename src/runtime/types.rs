use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::task::types::{RestartPolicy, Task};

/// Opaque identifier for a started workload, returned by the runtime on start
/// and used to address the workload on stop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuntimeHandle(String);

impl RuntimeHandle {
    pub fn new(id: impl Into<String>) -> Self {
        RuntimeHandle(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuntimeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything a runtime backend needs to start a workload, derived from the
/// task's declared attributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeSpec {
    pub name: String,
    pub image: String,
    pub env: Vec<String>,
    pub exposed_ports: Vec<u16>,
    pub cpu: f64,
    pub memory: i64,
    pub disk: i64,
    pub restart_policy: RestartPolicy,
}

impl From<&Task> for RuntimeSpec {
    fn from(task: &Task) -> Self {
        RuntimeSpec {
            name: task.name.clone(),
            image: task.image.clone(),
            env: task.env.clone(),
            exposed_ports: task.exposed_ports.clone(),
            cpu: task.cpu,
            memory: task.memory,
            disk: task.disk,
            restart_policy: task.restart_policy,
        }
    }
}

/// Failure surfaced by a runtime backend. Image pull errors, rejected
/// resource allocations and an unreachable daemon all collapse into one shape
/// carrying the failed action and a human-readable cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("runtime {action} failed: {cause}")]
pub struct RuntimeError {
    pub action: &'static str,
    pub cause: String,
}

impl RuntimeError {
    pub fn start(cause: impl fmt::Display) -> Self {
        RuntimeError {
            action: "start",
            cause: cause.to_string(),
        }
    }

    pub fn stop(cause: impl fmt::Display) -> Self {
        RuntimeError {
            action: "stop",
            cause: cause.to_string(),
        }
    }
}

/// Capability interface over the external container runtime.
///
/// Both operations have externally observable side effects (a running or
/// absent workload) and must be treated as having occurred even when the call
/// errors after partially completing. `stop` is not guaranteed idempotent by
/// the backend; callers must not stop the same handle twice without knowing
/// the first call's outcome.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Prepare the image if needed, allocate the workload with the requested
    /// limits and restart policy, begin execution, and return a handle.
    /// Either a usable handle or an error, never both.
    async fn start(&self, spec: &RuntimeSpec) -> Result<RuntimeHandle, RuntimeError>;

    /// Terminate the workload and reclaim runtime-side resources.
    async fn stop(&self, handle: &RuntimeHandle) -> Result<(), RuntimeError>;
}
