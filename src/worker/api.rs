use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, State as AxumState},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use sysinfo::System;
use tokio::net::TcpListener;
use tracing::info;
use uuid::Uuid;

use super::stats::SystemStats;
use super::types::WorkerError;
use super::worker::WorkerHandle;
use crate::task::types::{Intent, State, TaskRecord};

/// HTTP surface of one worker: intent submission and status queries.
pub struct ApiServer {
    handle: WorkerHandle,
    address: String,
    port: String,
}

impl ApiServer {
    pub fn new(handle: WorkerHandle, address: &str, port: &str) -> Self {
        Self {
            handle,
            address: address.to_string(),
            port: port.to_string(),
        }
    }

    pub async fn serve(self) -> std::io::Result<()> {
        let bind = format!("{}:{}", self.address, self.port);
        info!(worker = %self.handle.name(), %bind, "starting worker api");

        let listener = TcpListener::bind(&bind).await?;
        axum::serve(listener, router(self.handle)).await
    }
}

#[derive(Clone)]
struct ApiState {
    handle: WorkerHandle,
    // One System for the server's lifetime: cpu usage needs successive
    // refreshes of the same instance to produce a real sample.
    sysinfo: Arc<Mutex<System>>,
}

pub fn router(handle: WorkerHandle) -> Router {
    let state = ApiState {
        handle,
        sysinfo: Arc::new(Mutex::new(System::new_all())),
    };

    Router::new()
        .route("/tasks", get(list_tasks).post(submit_intent))
        .route("/tasks/{id}", get(get_task).delete(stop_task))
        .route("/stats", get(stats))
        .with_state(state)
}

async fn list_tasks(AxumState(state): AxumState<ApiState>) -> Json<Vec<TaskRecord>> {
    Json(state.handle.records())
}

async fn get_task(
    AxumState(state): AxumState<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskRecord>, StatusCode> {
    state.handle.record(&id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// Accepting an intent means it was enqueued, not that it was processed.
async fn submit_intent(
    AxumState(state): AxumState<ApiState>,
    Json(intent): Json<Intent>,
) -> impl IntoResponse {
    let task_id = intent.task.id;
    match state.handle.submit(intent).await {
        Ok(()) => {
            info!(task = %task_id, "intent accepted");
            StatusCode::CREATED.into_response()
        }
        Err(WorkerError::QueueClosed) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "worker is shutting down".to_string(),
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

/// Enqueue a stop intent for a known task.
async fn stop_task(
    AxumState(state): AxumState<ApiState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let Some(record) = state.handle.record(&id) else {
        return (StatusCode::NOT_FOUND, format!("task {id} not found")).into_response();
    };

    let mut task = record.task;
    task.state = State::Completed;
    match state.handle.submit(Intent::new(task)).await {
        Ok(()) => {
            info!(task = %id, "stop intent accepted");
            (StatusCode::ACCEPTED, format!("stop accepted for task {id}")).into_response()
        }
        Err(WorkerError::QueueClosed) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "worker is shutting down".to_string(),
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

async fn stats(AxumState(state): AxumState<ApiState>) -> impl IntoResponse {
    let task_count = state.handle.task_count() as u64;
    let snapshot = {
        let mut sysinfo = state.sysinfo.lock().expect("sysinfo lock poisoned");
        sysinfo.refresh_all();
        SystemStats::collect(&sysinfo, task_count)
    };
    Json(snapshot)
}
