use std::collections::{HashMap, VecDeque};

use tracing::{info, warn};
use uuid::Uuid;

use super::types::{ManagerError, RoundRobin, WorkerSelector};
use crate::task::types::{Intent, State, Task, TaskRecord};

/// Control-plane collaborator: accepts task intents and fans them out to
/// workers over their HTTP APIs.
///
/// The manager keeps its own view of every task it has placed and refreshes
/// it by polling the workers' status endpoints. It never mutates worker
/// records directly; all state changes travel as intents.
pub struct Manager {
    workers: Vec<String>,
    selector: Box<dyn WorkerSelector>,
    pending: VecDeque<Task>,
    task_db: HashMap<Uuid, Task>,
    intent_db: HashMap<Uuid, Intent>,
    task_worker: HashMap<Uuid, String>,
    client: reqwest::Client,
}

impl Manager {
    /// A manager over the given worker addresses with round-robin placement.
    pub fn new(workers: Vec<String>) -> Self {
        Self::with_selector(workers, Box::new(RoundRobin::default()))
    }

    pub fn with_selector(workers: Vec<String>, selector: Box<dyn WorkerSelector>) -> Self {
        Manager {
            workers,
            selector,
            pending: VecDeque::new(),
            task_db: HashMap::new(),
            intent_db: HashMap::new(),
            task_worker: HashMap::new(),
            client: reqwest::Client::new(),
        }
    }

    /// Queue a task for placement. It is not sent until [`Manager::send_work`].
    pub fn add_task(&mut self, task: Task) {
        self.pending.push_back(task);
    }

    pub fn task(&self, id: &Uuid) -> Option<&Task> {
        self.task_db.get(id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Place the next pending task: pick a worker, mark the task `Scheduled`
    /// and submit the intent to that worker's API.
    ///
    /// The manager's view only records the placement after the worker
    /// accepted it; a task whose submission fails goes back to the front of
    /// the pending queue so a later attempt can place it.
    pub async fn send_work(&mut self) -> Result<(), ManagerError> {
        let Some(task) = self.pending.pop_front() else {
            return Ok(());
        };

        let worker = match self.selector.select_worker(&task, &self.workers) {
            Some(index) => self.workers[index].clone(),
            None => {
                self.pending.push_front(task);
                return Err(ManagerError::NoWorkersAvailable);
            }
        };

        let mut placed = task.clone();
        placed.state = State::Scheduled;
        let intent = Intent::new(placed.clone());

        if let Err(err) = self.submit_intent(&worker, &intent).await {
            // The worker never saw the intent; the task stays placeable.
            self.pending.push_front(task);
            return Err(err);
        }

        info!(task = %placed.id, %worker, "task placed");
        self.intent_db.insert(placed.id, intent);
        self.task_worker.insert(placed.id, worker);
        self.task_db.insert(placed.id, placed);
        Ok(())
    }

    /// Poll every worker's status endpoint and refresh the local task view.
    pub async fn update_tasks(&mut self) {
        for worker in self.workers.clone() {
            let records = match self.fetch_records(&worker).await {
                Ok(records) => records,
                Err(err) => {
                    warn!(%worker, error = %err, "failed to poll worker");
                    continue;
                }
            };

            for record in records {
                let Some(local) = self.task_db.get_mut(&record.task.id) else {
                    continue;
                };
                if local.state != record.task.state {
                    info!(
                        task = %record.task.id,
                        from = %local.state,
                        to = %record.task.state,
                        "observed state change"
                    );
                }
                local.state = record.task.state;
                local.runtime_handle = record.task.runtime_handle.clone();
                local.start_time = record.task.start_time;
                local.finish_time = record.task.finish_time;
            }
        }
    }

    async fn submit_intent(&self, worker: &str, intent: &Intent) -> Result<(), ManagerError> {
        let url = format!("http://{worker}/tasks");
        let response = self
            .client
            .post(&url)
            .json(intent)
            .send()
            .await
            .map_err(|source| ManagerError::WorkerUnreachable {
                worker: worker.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ManagerError::WorkerRejected {
                worker: worker.to_string(),
                status: response.status().as_u16(),
            })
        }
    }

    async fn fetch_records(&self, worker: &str) -> Result<Vec<TaskRecord>, ManagerError> {
        let url = format!("http://{worker}/tasks");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| ManagerError::WorkerUnreachable {
                worker: worker.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(ManagerError::WorkerRejected {
                worker: worker.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|source| ManagerError::WorkerUnreachable {
                worker: worker.to_string(),
                source,
            })
    }
}
