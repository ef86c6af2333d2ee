// Container runtime access via bollard

mod stats;

use crate::reader::{ContainerRecord, ContainerRuntime, RawContainerStats, RawPortMapping};
use async_trait::async_trait;
use bollard::Docker;
use bollard::query_parameters::{ListContainersOptions, StatsOptions};
use futures_util::StreamExt;
use tracing::instrument;

pub struct DockerRepo {
    docker: Docker,
}

impl DockerRepo {
    /// Builds the client only; nothing is contacted until the first call.
    pub fn connect() -> anyhow::Result<Self> {
        let docker = Docker::connect_with_unix_defaults()?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRepo {
    #[instrument(skip(self), fields(repo = "docker", operation = "ping"))]
    async fn ping(&self) -> anyhow::Result<()> {
        self.docker.ping().await?;
        Ok(())
    }

    #[instrument(skip(self), fields(repo = "docker", operation = "list_containers"))]
    async fn list_containers(&self) -> anyhow::Result<Vec<ContainerRecord>> {
        let options = ListContainersOptions {
            all: true,
            ..Default::default()
        };
        let containers = self.docker.list_containers(Some(options)).await?;
        Ok(containers
            .into_iter()
            .map(|c| ContainerRecord {
                id: c.id.unwrap_or_default(),
                names: c.names.unwrap_or_default(),
                image: c.image.unwrap_or_default(),
                status: c.status.unwrap_or_default(),
                state: c.state.map(|s| s.to_string()).unwrap_or_default(),
                ports: c
                    .ports
                    .unwrap_or_default()
                    .into_iter()
                    .map(|p| RawPortMapping {
                        private_port: p.private_port,
                        public_port: p.public_port,
                        protocol: p.typ.map(|t| t.to_string()),
                        ip: p.ip,
                    })
                    .collect(),
                created: c.created.unwrap_or_default(),
            })
            .collect())
    }

    #[instrument(skip(self), fields(repo = "docker", operation = "container_stats"))]
    async fn container_stats(&self, id: &str) -> anyhow::Result<RawContainerStats> {
        let options = StatsOptions {
            stream: false,
            one_shot: true,
        };
        let mut stream = self.docker.stats(id, Some(options));
        let response = stream
            .next()
            .await
            .ok_or_else(|| anyhow::anyhow!("empty stats response for {}", id))??;
        stats::raw_stats(&response)
    }
}
