// Fan-out to every collector, fan-in to one composite snapshot.

use crate::collectors::{self, CollectionContext};
use crate::error::{MonitorError, Result};
use crate::models::{Container, ContainerSnapshot, Domain, DomainSnapshot, Snapshot, now_millis};
use crate::reader::{ContainerRuntime, HostReader};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Collection timing shared by every cycle.
#[derive(Debug, Clone, Copy)]
pub struct CollectSettings {
    /// Blocking window for the CPU usage sample.
    pub cpu_window: Duration,
    /// Upper bound for any single collector; a collector that misses it is unavailable.
    pub collector_timeout: Duration,
}

impl Default for CollectSettings {
    fn default() -> Self {
        Self {
            cpu_window: Duration::from_secs(1),
            collector_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Clone)]
pub struct Aggregator {
    host: Arc<dyn HostReader>,
    runtime: Option<Arc<dyn ContainerRuntime>>,
    settings: CollectSettings,
}

impl Aggregator {
    pub fn new(
        host: Arc<dyn HostReader>,
        runtime: Option<Arc<dyn ContainerRuntime>>,
        settings: CollectSettings,
    ) -> Self {
        Self {
            host,
            runtime,
            settings,
        }
    }

    /// Run every collector concurrently and assemble one snapshot. A domain
    /// that fails or times out is left empty; its siblings are unaffected.
    #[tracing::instrument(skip(self, ctx), fields(operation = "collect_all"))]
    pub async fn collect_all(&self, ctx: &CollectionContext, top_n: usize) -> Snapshot {
        let timestamp = now_millis();
        let host = self.host.as_ref();
        let runtime = self.runtime.as_deref();

        let (system, cpu, memory, disk, network, process, port, container) = tokio::join!(
            self.bounded(Domain::System, collectors::system::collect(host)),
            self.bounded(Domain::Cpu, collectors::cpu::collect(host, self.settings.cpu_window)),
            self.bounded(Domain::Memory, collectors::memory::collect(host)),
            self.bounded(Domain::Disk, collectors::disk::collect(host)),
            self.bounded(Domain::Network, collectors::network::collect(host)),
            self.bounded(Domain::Process, collectors::process::collect(host, top_n)),
            self.bounded(Domain::Port, collectors::port::collect(host)),
            self.bounded(Domain::Container, collectors::container::collect(runtime, ctx)),
        );

        Snapshot {
            timestamp,
            system: slot(system),
            cpu: slot(cpu),
            memory: slot(memory),
            disk: slot(disk),
            network: slot(network),
            process: slot(process),
            port: slot(port),
            container: slot(container).unwrap_or_else(|| ContainerSnapshot::unavailable(now_millis())),
        }
    }

    /// Collect a single domain. The container domain never errors: an
    /// unreachable runtime yields `available = false`.
    #[tracing::instrument(skip(self, ctx), fields(operation = "collect_domain"))]
    pub async fn collect_domain(
        &self,
        ctx: &CollectionContext,
        domain: Domain,
        top_n: usize,
    ) -> Result<DomainSnapshot> {
        let host = self.host.as_ref();
        match domain {
            Domain::System => self
                .bounded(domain, collectors::system::collect(host))
                .await
                .map(DomainSnapshot::System),
            Domain::Cpu => self
                .bounded(domain, collectors::cpu::collect(host, self.settings.cpu_window))
                .await
                .map(DomainSnapshot::Cpu),
            Domain::Memory => self
                .bounded(domain, collectors::memory::collect(host))
                .await
                .map(DomainSnapshot::Memory),
            Domain::Disk => self
                .bounded(domain, collectors::disk::collect(host))
                .await
                .map(DomainSnapshot::Disk),
            Domain::Network => self
                .bounded(domain, collectors::network::collect(host))
                .await
                .map(DomainSnapshot::Network),
            Domain::Process => self
                .bounded(domain, collectors::process::collect(host, top_n))
                .await
                .map(DomainSnapshot::Process),
            Domain::Port => self
                .bounded(domain, collectors::port::collect(host))
                .await
                .map(DomainSnapshot::Port),
            Domain::Container => {
                let result = self
                    .bounded(
                        domain,
                        collectors::container::collect(self.runtime.as_deref(), ctx),
                    )
                    .await;
                let snapshot =
                    slot(result).unwrap_or_else(|| ContainerSnapshot::unavailable(now_millis()));
                Ok(DomainSnapshot::Container(snapshot))
            }
        }
    }

    /// Find one container by full id or id prefix (first match).
    pub async fn container_detail(
        &self,
        ctx: &CollectionContext,
        id: &str,
    ) -> Result<Option<Container>> {
        self.bounded(
            Domain::Container,
            collectors::container::detail(self.runtime.as_deref(), ctx, id),
        )
        .await
    }

    async fn bounded<T>(&self, domain: Domain, fut: impl Future<Output = Result<T>>) -> Result<T> {
        let limit = self.settings.collector_timeout;
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(MonitorError::unavailable(
                domain,
                format!("collector did not finish within {:?}", limit),
            )),
        }
    }
}

fn slot<T>(result: Result<T>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(error = %e, operation = "collect_domain", "domain unavailable this cycle");
            None
        }
    }
}
