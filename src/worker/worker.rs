use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::store::RecordStore;
use super::types::{WorkerConfig, WorkerError};
use crate::runtime::types::{ContainerRuntime, RuntimeSpec};
use crate::task::state::valid_state_transition;
use crate::task::types::{Intent, State, Task, TaskRecord};

/// An intent travelling through the worker's queue, with an optional reply
/// channel for submitters that want the reconciliation outcome.
struct QueuedIntent {
    intent: Intent,
    reply: Option<oneshot::Sender<Result<TaskRecord, WorkerError>>>,
}

/// The reconciliation loop: the sole writer to the record store and the sole
/// caller of the runtime adapter.
///
/// Intents are processed strictly one at a time in submission order, so no two
/// dispatches for this worker ever race against the runtime.
pub struct Worker {
    name: String,
    store: Arc<RecordStore>,
    runtime: Arc<dyn ContainerRuntime>,
    intents: mpsc::Receiver<QueuedIntent>,
    shutdown: watch::Receiver<bool>,
    config: WorkerConfig,
}

/// Cloneable handle to a running worker: submit intents, read records,
/// request shutdown.
#[derive(Clone)]
pub struct WorkerHandle {
    name: String,
    intents: mpsc::Sender<QueuedIntent>,
    shutdown: watch::Sender<bool>,
    store: Arc<RecordStore>,
}

impl Worker {
    /// Spawn a worker's reconciliation loop onto the tokio runtime.
    ///
    /// Generic over the runtime so concrete backends (and the test fake)
    /// pass without an explicit `Arc<dyn ContainerRuntime>` coercion.
    pub fn spawn(
        config: WorkerConfig,
        runtime: Arc<impl ContainerRuntime + 'static>,
    ) -> (WorkerHandle, JoinHandle<()>) {
        let (intent_tx, intent_rx) = mpsc::channel(config.queue_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let store = Arc::new(RecordStore::new());

        let worker = Worker {
            name: config.name.clone(),
            store: Arc::clone(&store),
            runtime,
            intents: intent_rx,
            shutdown: shutdown_rx,
            config: config.clone(),
        };
        let join = tokio::spawn(worker.run());

        let handle = WorkerHandle {
            name: config.name,
            intents: intent_tx,
            shutdown: shutdown_tx,
            store,
        };
        (handle, join)
    }

    async fn run(mut self) {
        info!(worker = %self.name, "reconciliation loop started");
        let mut draining = false;

        loop {
            let queued = tokio::select! {
                changed = self.shutdown.changed(), if !draining => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        // Reject new submissions; intents already accepted are
                        // drained and the in-flight dispatch runs to completion.
                        self.intents.close();
                        draining = true;
                        info!(worker = %self.name, "draining intent queue");
                    }
                    continue;
                }
                queued = self.intents.recv() => queued,
            };

            let Some(queued) = queued else { break };
            self.handle_intent(queued).await;
        }

        info!(worker = %self.name, "reconciliation loop stopped");
    }

    async fn handle_intent(&mut self, queued: QueuedIntent) {
        let task_id = queued.intent.task.id;
        let result = self.process(queued.intent).await;

        match &result {
            Ok(record) => {
                info!(worker = %self.name, task = %task_id, state = %record.task.state, "intent reconciled")
            }
            Err(err) => {
                warn!(worker = %self.name, task = %task_id, error = %err, "intent not reconciled")
            }
        }

        if let Some(reply) = queued.reply {
            // The submitter may have gone away; that is their problem.
            let _ = reply.send(result);
        }
    }

    /// Reconcile one intent: lookup, validate, dispatch, persist.
    async fn process(&mut self, intent: Intent) -> Result<TaskRecord, WorkerError> {
        let current = self.store.get(&intent.task.id);
        // A task never seen before starts its life at Pending.
        let current_state = current.as_ref().map_or(State::Pending, TaskRecord::state);
        let desired = intent.desired_state();

        if !valid_state_transition(current_state, desired) {
            return Err(WorkerError::InvalidTransition {
                from: current_state,
                to: desired,
            });
        }

        if let Some(existing) = current.as_ref() {
            if existing.task.state == desired {
                // Duplicate delivery of an already-reconciled intent. The
                // runtime is not touched again; stop in particular must not
                // be dispatched twice for one handle.
                debug!(worker = %self.name, task = %intent.task.id, state = %desired, "duplicate intent, no-op");
                return Ok(existing.clone());
            }
        }

        match desired {
            State::Scheduled => self.start_task(intent.task).await,
            State::Completed => self.stop_task(intent.task, current).await,
            _ => {
                // No runtime effect for this desired state; persist the
                // snapshot as the new record.
                let record = TaskRecord::new(intent.task);
                self.store.put(record.clone());
                Ok(record)
            }
        }
    }

    async fn start_task(&mut self, mut task: Task) -> Result<TaskRecord, WorkerError> {
        let spec = RuntimeSpec::from(&task);

        match timeout(self.config.dispatch_timeout, self.runtime.start(&spec)).await {
            Ok(Ok(handle)) => {
                task.state = State::Running;
                task.runtime_handle = Some(handle);
                task.start_time = Some(SystemTime::now());
                let record = TaskRecord::new(task);
                self.store.put(record.clone());
                Ok(record)
            }
            Ok(Err(err)) => {
                // A failed start is a valid, persisted outcome, not a dropped
                // intent.
                task.state = State::Failed;
                task.runtime_handle = None;
                self.store.put(TaskRecord::with_fault(task, err.to_string()));
                Err(WorkerError::StartFailed(err))
            }
            Err(_) => {
                let err = WorkerError::DispatchTimeout {
                    action: "start",
                    after: self.config.dispatch_timeout,
                };
                task.state = State::Failed;
                task.runtime_handle = None;
                self.store.put(TaskRecord::with_fault(task, err.to_string()));
                Err(err)
            }
        }
    }

    async fn stop_task(
        &mut self,
        mut task: Task,
        current: Option<TaskRecord>,
    ) -> Result<TaskRecord, WorkerError> {
        // The handle comes from the stored record; the submitter's snapshot
        // may be stale or missing it.
        let handle = current
            .as_ref()
            .and_then(|r| r.task.runtime_handle.clone())
            .or_else(|| task.runtime_handle.clone())
            .ok_or(WorkerError::MissingHandle(task.id))?;

        match timeout(self.config.dispatch_timeout, self.runtime.stop(&handle)).await {
            Ok(Ok(())) => {
                task.state = State::Completed;
                task.runtime_handle = Some(handle);
                task.start_time = task
                    .start_time
                    .or(current.and_then(|r| r.task.start_time));
                task.finish_time = Some(SystemTime::now());
                let record = TaskRecord::new(task);
                self.store.put(record.clone());
                Ok(record)
            }
            // The workload's real status is now unknown. The record is left
            // untouched (still Running) until an external reconciliation pass
            // can verify what actually happened; it must not read Completed.
            Ok(Err(err)) => Err(WorkerError::StopFailed(err)),
            Err(_) => Err(WorkerError::DispatchTimeout {
                action: "stop",
                after: self.config.dispatch_timeout,
            }),
        }
    }
}

impl WorkerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue an intent. `Ok` means accepted, not yet processed.
    pub async fn submit(&self, intent: Intent) -> Result<(), WorkerError> {
        self.intents
            .send(QueuedIntent {
                intent,
                reply: None,
            })
            .await
            .map_err(|_| WorkerError::QueueClosed)
    }

    /// Enqueue an intent and wait for its reconciliation outcome.
    pub async fn submit_and_wait(&self, intent: Intent) -> Result<TaskRecord, WorkerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.intents
            .send(QueuedIntent {
                intent,
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| WorkerError::QueueClosed)?;
        reply_rx.await.map_err(|_| WorkerError::QueueClosed)?
    }

    /// Status query: the last-known record for a task, if any.
    pub fn record(&self, id: &Uuid) -> Option<TaskRecord> {
        self.store.get(id)
    }

    pub fn records(&self) -> Vec<TaskRecord> {
        self.store.list()
    }

    pub fn task_count(&self) -> usize {
        self.store.len()
    }

    /// Stop accepting new intents. Intents already accepted are still
    /// processed before the loop exits.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}
