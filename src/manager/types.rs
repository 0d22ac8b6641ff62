use thiserror::Error;

use crate::task::types::Task;

/// Placement policy: pick which worker receives a task.
///
/// Cluster-wide scheduling is not this crate's concern; the manager only
/// requires some policy to exist. The default is [`RoundRobin`].
pub trait WorkerSelector: Send + Sync {
    /// Return the index of the chosen worker in `workers`, or `None` when no
    /// worker can take the task.
    fn select_worker(&mut self, task: &Task, workers: &[String]) -> Option<usize>;
}

/// Cycle through workers in order, ignoring the task.
#[derive(Debug, Default)]
pub struct RoundRobin {
    next: usize,
}

impl WorkerSelector for RoundRobin {
    fn select_worker(&mut self, _task: &Task, workers: &[String]) -> Option<usize> {
        if workers.is_empty() {
            return None;
        }
        let picked = self.next % workers.len();
        self.next = (picked + 1) % workers.len();
        Some(picked)
    }
}

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("no workers are available to handle tasks")]
    NoWorkersAvailable,

    #[error("worker {worker} rejected the request with status {status}")]
    WorkerRejected { worker: String, status: u16 },

    #[error("failed to reach worker {worker}: {source}")]
    WorkerUnreachable {
        worker: String,
        #[source]
        source: reqwest::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_robin_cycles_through_workers() {
        let workers = vec!["a:1".to_string(), "b:2".to_string(), "c:3".to_string()];
        let task = Task::new("t", "busybox:latest");
        let mut rr = RoundRobin::default();

        let picks: Vec<usize> = (0..6)
            .map(|_| rr.select_worker(&task, &workers).unwrap())
            .collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn round_robin_with_no_workers_selects_nothing() {
        let task = Task::new("t", "busybox:latest");
        let mut rr = RoundRobin::default();
        assert!(rr.select_worker(&task, &[]).is_none());
    }
}
