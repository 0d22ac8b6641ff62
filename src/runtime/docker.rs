use std::collections::HashMap;

use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{
    CreateContainerOptions, RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::secret::{HostConfig, RestartPolicy, RestartPolicyNameEnum};
use futures_util::stream::StreamExt;
use tracing::{debug, info, warn};

use super::types::{ContainerRuntime, RuntimeError, RuntimeHandle, RuntimeSpec};
use crate::task::types::RestartPolicy as TaskRestartPolicy;

/// Docker-backed runtime. The returned [`RuntimeHandle`] is the container id.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    client: Docker,
}

impl DockerRuntime {
    /// Connect using the default unix socket.
    pub fn new() -> Result<Self, RuntimeError> {
        let client = Docker::connect_with_unix_defaults()
            .map_err(|e| RuntimeError::start(format!("docker daemon unreachable: {e}")))?;
        Ok(DockerRuntime { client })
    }

    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError> {
        info!(%image, "pulling image");

        let mut stream = self.client.create_image(
            Some(CreateImageOptions {
                from_image: image.to_string(),
                ..Default::default()
            }),
            None,
            None,
        );

        while let Some(msg) = stream.next().await {
            match msg {
                Ok(progress) => {
                    if let Some(status) = progress.status {
                        debug!(%image, %status, "pull progress");
                    }
                }
                Err(e) => {
                    warn!(%image, error = %e, "image pull failed");
                    return Err(RuntimeError::start(format!("pulling image {image}: {e}")));
                }
            }
        }

        Ok(())
    }
}

fn restart_policy_name(policy: TaskRestartPolicy) -> RestartPolicyNameEnum {
    match policy {
        TaskRestartPolicy::No => RestartPolicyNameEnum::NO,
        TaskRestartPolicy::Always => RestartPolicyNameEnum::ALWAYS,
        TaskRestartPolicy::OnFailure => RestartPolicyNameEnum::ON_FAILURE,
        TaskRestartPolicy::UnlessStopped => RestartPolicyNameEnum::UNLESS_STOPPED,
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn start(&self, spec: &RuntimeSpec) -> Result<RuntimeHandle, RuntimeError> {
        self.pull_image(&spec.image).await?;

        let restart_policy = RestartPolicy {
            name: Some(restart_policy_name(spec.restart_policy)),
            maximum_retry_count: None,
        };

        let host_config = HostConfig {
            restart_policy: Some(restart_policy),
            memory: (spec.memory > 0).then_some(spec.memory),
            nano_cpus: (spec.cpu > 0.0).then_some((spec.cpu * 1_000_000_000.0) as i64),
            publish_all_ports: Some(true),
            ..Default::default()
        };

        // Docker keys exposed ports as "<port>/tcp".
        let exposed_ports: HashMap<String, HashMap<(), ()>> = spec
            .exposed_ports
            .iter()
            .map(|port| (format!("{port}/tcp"), HashMap::new()))
            .collect();

        let config = bollard::container::Config {
            image: Some(spec.image.clone()),
            env: Some(spec.env.clone()),
            exposed_ports: Some(exposed_ports),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = Some(CreateContainerOptions {
            name: spec.name.clone(),
            ..Default::default()
        });

        let created = self
            .client
            .create_container(options, config)
            .await
            .map_err(|e| RuntimeError::start(format!("creating container: {e}")))?;

        if let Err(e) = self
            .client
            .start_container(&created.id, None::<StartContainerOptions<String>>)
            .await
        {
            warn!(container = %created.id, error = %e, "container failed to start");
            return Err(RuntimeError::start(format!(
                "starting container {}: {e}",
                created.id
            )));
        }

        info!(container = %created.id, image = %spec.image, "container started");
        Ok(RuntimeHandle::new(created.id))
    }

    async fn stop(&self, handle: &RuntimeHandle) -> Result<(), RuntimeError> {
        info!(container = %handle, "stopping container");

        self.client
            .stop_container(handle.as_str(), None::<StopContainerOptions>)
            .await
            .map_err(|e| RuntimeError::stop(format!("stopping container {handle}: {e}")))?;

        // Volumes go with the container so the runtime holds no storage for
        // stopped tasks.
        self.client
            .remove_container(
                handle.as_str(),
                Some(RemoveContainerOptions {
                    v: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| RuntimeError::stop(format!("removing container {handle}: {e}")))?;

        info!(container = %handle, "container stopped and removed");
        Ok(())
    }
}
