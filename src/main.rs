use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use stevedore::manager::Manager;
use stevedore::runtime::DockerRuntime;
use stevedore::task::types::Task;
use stevedore::worker::api::ApiServer;
use stevedore::worker::{Worker, WorkerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let address = std::env::var("STEVEDORE_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = std::env::var("STEVEDORE_PORT").unwrap_or_else(|_| "8080".to_string());

    let runtime = match DockerRuntime::new() {
        Ok(runtime) => Arc::new(runtime),
        Err(err) => {
            error!(%err, "cannot connect to the container runtime");
            return Err(err.into());
        }
    };

    let (handle, _join) = Worker::spawn(WorkerConfig::new("worker-1"), runtime);
    let server = ApiServer::new(handle.clone(), &address, &port);

    // Demo manager: place a few hello-world tasks onto this worker once the
    // API is up.
    let workers = vec![format!("{address}:{port}")];
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;

        let mut manager = Manager::new(workers);
        for i in 0..3 {
            let mut task = Task::new(format!("demo-task-{i}"), "hello-world:latest");
            task.memory = 64 * 1024 * 1024;
            manager.add_task(task);
            if let Err(err) = manager.send_work().await {
                error!(%err, "failed to place demo task");
            }
        }

        tokio::time::sleep(Duration::from_secs(5)).await;
        manager.update_tasks().await;
        info!("demo manager finished");
    });

    server.serve().await?;
    Ok(())
}
