//! End-to-end reconciliation scenarios against the scripted fake runtime.

use std::sync::Arc;
use std::time::Duration;

use stevedore::runtime::{FakeRuntime, RuntimeError, RuntimeHandle};
use stevedore::task::types::{Intent, State, Task};
use stevedore::worker::{Worker, WorkerConfig, WorkerError};

fn scheduled_task(name: &str, image: &str) -> Task {
    let mut task = Task::new(name, image);
    task.state = State::Scheduled;
    task
}

#[tokio::test]
async fn task_lifecycle_run_then_stop() {
    let fake = Arc::new(FakeRuntime::new());
    fake.script_start(Ok(RuntimeHandle::new("h1")));
    let (handle, _join) = Worker::spawn(WorkerConfig::new("w1"), Arc::clone(&fake));

    // Run it.
    let task = scheduled_task("t1", "sample:1");
    let record = handle
        .submit_and_wait(Intent::new(task.clone()))
        .await
        .expect("start should succeed");
    assert_eq!(record.task.state, State::Running);
    assert_eq!(record.task.runtime_handle, Some(RuntimeHandle::new("h1")));
    assert!(record.task.start_time.is_some());

    // Stop it.
    let mut stop = task.clone();
    stop.state = State::Completed;
    let record = handle
        .submit_and_wait(Intent::new(stop))
        .await
        .expect("stop should succeed");
    assert_eq!(record.task.state, State::Completed);
    assert!(record.task.finish_time.is_some());
    assert_eq!(fake.stopped(), vec![RuntimeHandle::new("h1")]);

    // The store keeps the terminal record.
    assert_eq!(
        handle.record(&task.id).map(|r| r.task.state),
        Some(State::Completed)
    );
}

#[tokio::test]
async fn failed_start_is_a_persisted_outcome() {
    let fake = Arc::new(FakeRuntime::new());
    fake.script_start(Err(RuntimeError::start("image not found")));
    let (handle, _join) = Worker::spawn(WorkerConfig::new("w1"), fake);

    let task = scheduled_task("t2", "missing:latest");
    let err = handle
        .submit_and_wait(Intent::new(task.clone()))
        .await
        .expect_err("start should fail");
    assert!(matches!(err, WorkerError::StartFailed(_)));
    assert!(err.to_string().contains("image not found"));

    let record = handle.record(&task.id).expect("failure must be recorded");
    assert_eq!(record.task.state, State::Failed);
    assert_eq!(record.task.runtime_handle, None);
    assert!(record.fault.is_some());
}

#[tokio::test]
async fn one_intents_failure_does_not_poison_the_loop() {
    let fake = Arc::new(FakeRuntime::new());
    fake.script_start(Err(RuntimeError::start("allocation rejected")));
    fake.script_start(Ok(RuntimeHandle::new("h2")));
    let (handle, _join) = Worker::spawn(WorkerConfig::new("w1"), fake);

    let doomed = scheduled_task("doomed", "sample:1");
    let healthy = scheduled_task("healthy", "sample:1");

    assert!(handle.submit_and_wait(Intent::new(doomed.clone())).await.is_err());
    let record = handle
        .submit_and_wait(Intent::new(healthy.clone()))
        .await
        .expect("loop must keep processing after a failure");

    assert_eq!(record.task.state, State::Running);
    assert_eq!(handle.record(&doomed.id).unwrap().task.state, State::Failed);
}

#[tokio::test]
async fn dispatches_happen_in_submission_order_and_never_concurrently() {
    let fake = Arc::new(FakeRuntime::new());
    // Give overlapping dispatch a chance to show up if it were possible.
    fake.set_delay(Duration::from_millis(10));
    let (handle, join) = Worker::spawn(WorkerConfig::new("w1"), Arc::clone(&fake));

    let mut names = Vec::new();
    for i in 0..10 {
        let name = format!("ordered-{i}");
        names.push(name.clone());
        handle
            .submit(Intent::new(scheduled_task(&name, "sample:1")))
            .await
            .expect("queue should accept");
    }

    handle.shutdown();
    join.await.unwrap();

    assert_eq!(fake.started(), names);
    assert!(!fake.saw_concurrent_dispatch());
}

#[tokio::test]
async fn concurrent_submitters_never_produce_concurrent_dispatch() {
    let fake = Arc::new(FakeRuntime::new());
    fake.set_delay(Duration::from_millis(5));
    let (handle, join) = Worker::spawn(WorkerConfig::new("w1"), Arc::clone(&fake));

    let mut submitters = Vec::new();
    for i in 0..4 {
        let handle = handle.clone();
        submitters.push(tokio::spawn(async move {
            for j in 0..5 {
                let task = scheduled_task(&format!("s{i}-{j}"), "sample:1");
                handle.submit(Intent::new(task)).await.unwrap();
            }
        }));
    }
    for submitter in submitters {
        submitter.await.unwrap();
    }

    handle.shutdown();
    join.await.unwrap();

    assert_eq!(fake.started().len(), 20);
    assert!(!fake.saw_concurrent_dispatch());
}

#[tokio::test]
async fn resubmitting_scheduled_while_running_is_rejected() {
    let fake = Arc::new(FakeRuntime::new());
    let (handle, _join) = Worker::spawn(WorkerConfig::new("w1"), Arc::clone(&fake));

    let task = scheduled_task("twice", "sample:1");
    handle.submit_and_wait(Intent::new(task.clone())).await.unwrap();

    let err = handle
        .submit_and_wait(Intent::new(task.clone()))
        .await
        .expect_err("Running -> Scheduled must be rejected");
    assert_eq!(
        err,
        WorkerError::InvalidTransition {
            from: State::Running,
            to: State::Scheduled
        }
    );
    // Exactly one container was ever started.
    assert_eq!(fake.started().len(), 1);
}

#[tokio::test]
async fn stop_error_keeps_the_task_running_in_the_record() {
    let fake = Arc::new(FakeRuntime::new());
    fake.script_stop(Err(RuntimeError::stop("runtime unreachable")));
    let (handle, _join) = Worker::spawn(WorkerConfig::new("w1"), fake);

    let task = scheduled_task("ambiguous", "sample:1");
    handle.submit_and_wait(Intent::new(task.clone())).await.unwrap();

    let mut stop = task.clone();
    stop.state = State::Completed;
    let err = handle
        .submit_and_wait(Intent::new(stop))
        .await
        .expect_err("stop should fail");
    assert!(matches!(err, WorkerError::StopFailed(_)));

    let record = handle.record(&task.id).unwrap();
    assert_eq!(record.task.state, State::Running);
    assert!(record.task.finish_time.is_none());
}
