use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::runtime::types::RuntimeHandle;

/// Lifecycle state of a task. Movement between states is constrained by the
/// transition table in [`crate::task::state`]; `Completed` and `Failed` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    Pending,
    Scheduled,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::Pending => "pending",
            State::Scheduled => "scheduled",
            State::Running => "running",
            State::Completed => "completed",
            State::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Container restart policy, serialized with the docker spellings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestartPolicy {
    #[default]
    #[serde(rename = "no")]
    No,
    #[serde(rename = "always")]
    Always,
    #[serde(rename = "on-failure")]
    OnFailure,
    #[serde(rename = "unless-stopped")]
    UnlessStopped,
}

impl RestartPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestartPolicy::No => "no",
            RestartPolicy::Always => "always",
            RestartPolicy::OnFailure => "on-failure",
            RestartPolicy::UnlessStopped => "unless-stopped",
        }
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of schedulable work.
///
/// `state`, `runtime_handle`, `start_time` and `finish_time` are owned by the
/// worker's reconciliation loop; submitters fill in the declarative fields and
/// set `state` to the lifecycle state they want the task moved toward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub state: State,
    pub image: String,
    pub cpu: f64,
    pub memory: i64,
    pub disk: i64,
    pub env: Vec<String>,
    pub exposed_ports: Vec<u16>,
    pub restart_policy: RestartPolicy,
    pub runtime_handle: Option<RuntimeHandle>,
    pub start_time: Option<SystemTime>,
    pub finish_time: Option<SystemTime>,
}

impl Task {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Task {
            id: Uuid::new_v4(),
            name: name.into(),
            state: State::Pending,
            image: image.into(),
            cpu: 0.0,
            memory: 0,
            disk: 0,
            env: Vec::new(),
            exposed_ports: Vec::new(),
            restart_policy: RestartPolicy::No,
            runtime_handle: None,
            start_time: None,
            finish_time: None,
        }
    }
}

/// A request to move a task toward a desired lifecycle state.
///
/// Carries a full task snapshot rather than a delta: the worker has no
/// independent source of task metadata. The snapshot's `state` field is the
/// desired state for this intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub id: Uuid,
    pub state: State,
    pub timestamp: Option<SystemTime>,
    pub task: Task,
}

impl Intent {
    /// Wrap a task snapshot; the desired state is taken from the snapshot.
    pub fn new(task: Task) -> Self {
        Intent {
            id: Uuid::new_v4(),
            state: task.state,
            timestamp: Some(SystemTime::now()),
            task,
        }
    }

    pub fn desired_state(&self) -> State {
        self.task.state
    }
}

/// The worker's persisted view of a task: the last snapshot accepted by the
/// reconciliation loop, reflecting actual observed state. `fault` holds the
/// cause of the last failed dispatch, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task: Task,
    pub fault: Option<String>,
}

impl TaskRecord {
    pub fn new(task: Task) -> Self {
        TaskRecord { task, fault: None }
    }

    pub fn with_fault(task: Task, fault: impl Into<String>) -> Self {
        TaskRecord {
            task,
            fault: Some(fault.into()),
        }
    }

    pub fn state(&self) -> State {
        self.task.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_policy_uses_docker_spellings() {
        assert_eq!(RestartPolicy::No.as_str(), "no");
        assert_eq!(RestartPolicy::OnFailure.as_str(), "on-failure");
        assert_eq!(RestartPolicy::UnlessStopped.as_str(), "unless-stopped");

        let json = serde_json::to_string(&RestartPolicy::OnFailure).unwrap();
        assert_eq!(json, "\"on-failure\"");
        let parsed: RestartPolicy = serde_json::from_str("\"unless-stopped\"").unwrap();
        assert_eq!(parsed, RestartPolicy::UnlessStopped);
    }

    #[test]
    fn intent_desired_state_tracks_snapshot() {
        let mut task = Task::new("t", "busybox:latest");
        task.state = State::Scheduled;
        let intent = Intent::new(task);
        assert_eq!(intent.state, State::Scheduled);
        assert_eq!(intent.desired_state(), State::Scheduled);
    }
}
