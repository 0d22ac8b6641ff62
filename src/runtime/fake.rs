use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::types::{ContainerRuntime, RuntimeError, RuntimeHandle, RuntimeSpec};

/// In-memory runtime returning scripted handles and errors.
///
/// Used to test the reconciliation loop deterministically without a live
/// docker daemon. Unscripted starts succeed with generated `fake-N` handles;
/// unscripted stops succeed. The fake also records dispatch order and whether
/// it ever observed two dispatches in flight at once.
#[derive(Default)]
pub struct FakeRuntime {
    inner: Mutex<Inner>,
    in_flight: AtomicUsize,
    overlapped: AtomicBool,
}

#[derive(Default)]
struct Inner {
    start_script: VecDeque<Result<RuntimeHandle, RuntimeError>>,
    stop_script: VecDeque<Result<(), RuntimeError>>,
    started: Vec<String>,
    stopped: Vec<RuntimeHandle>,
    next_handle: u64,
    delay: Option<Duration>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome of the next unscripted `start` call.
    pub fn script_start(&self, result: Result<RuntimeHandle, RuntimeError>) {
        self.lock().start_script.push_back(result);
    }

    /// Queue the outcome of the next unscripted `stop` call.
    pub fn script_stop(&self, result: Result<(), RuntimeError>) {
        self.lock().stop_script.push_back(result);
    }

    /// Make every dispatch sleep before resolving.
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    /// Names of the specs passed to `start`, in dispatch order.
    pub fn started(&self) -> Vec<String> {
        self.lock().started.clone()
    }

    /// Handles passed to `stop`, in dispatch order.
    pub fn stopped(&self) -> Vec<RuntimeHandle> {
        self.lock().stopped.clone()
    }

    /// Whether two dispatches were ever in flight concurrently.
    pub fn saw_concurrent_dispatch(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("fake runtime state poisoned")
    }

    // Guard-based so a dispatch cancelled at its deadline still leaves the
    // in-flight count correct.
    fn enter(&self) -> InFlightGuard<'_> {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        InFlightGuard(self)
    }

    async fn delay(&self) {
        let delay = self.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

struct InFlightGuard<'a>(&'a FakeRuntime);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn start(&self, spec: &RuntimeSpec) -> Result<RuntimeHandle, RuntimeError> {
        let _guard = self.enter();
        self.delay().await;

        let mut inner = self.lock();
        inner.started.push(spec.name.clone());
        match inner.start_script.pop_front() {
            Some(scripted) => scripted,
            None => {
                inner.next_handle += 1;
                Ok(RuntimeHandle::new(format!("fake-{}", inner.next_handle)))
            }
        }
    }

    async fn stop(&self, handle: &RuntimeHandle) -> Result<(), RuntimeError> {
        let _guard = self.enter();
        self.delay().await;

        let mut inner = self.lock();
        inner.stopped.push(handle.clone());
        inner.stop_script.pop_front().unwrap_or(Ok(()))
    }
}
