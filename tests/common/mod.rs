// Shared test helpers
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use syspulse::aggregator::{Aggregator, CollectSettings};
use syspulse::reader::fake::{FakeHost, FakeRuntime};
use syspulse::reader::{ContainerRecord, ContainerRuntime, RawContainerStats};

pub const WEB_ID: &str = "0a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8f9";
pub const DB_ID: &str = "f9e8d7c6b5a40918273645546372819f9e8d7c6b5a40918273645546372819ff";

pub fn fast_settings() -> CollectSettings {
    CollectSettings {
        cpu_window: Duration::from_millis(10),
        collector_timeout: Duration::from_millis(500),
    }
}

pub fn container(id: &str, name: &str, state: &str) -> ContainerRecord {
    ContainerRecord {
        id: id.into(),
        names: vec![format!("/{}", name)],
        image: format!("{}:latest", name),
        status: if state == "running" {
            "Up 5 minutes".into()
        } else {
            "Exited (0) 1 hour ago".into()
        },
        state: state.into(),
        ports: vec![],
        created: chrono::Utc::now().timestamp() - 300,
    }
}

pub fn container_stats(cpu_total: u64, system: u64) -> RawContainerStats {
    RawContainerStats {
        cpu_total_usage: cpu_total,
        system_usage: system,
        online_cpus: Some(2),
        percpu_count: 2,
        memory_usage: 256 * 1024 * 1024,
        memory_limit: 1024 * 1024 * 1024,
        networks: vec![(1024 * 1024, 2 * 1024 * 1024)],
        block_io: vec![("read".into(), 4096), ("write".into(), 8192)],
    }
}

pub fn aggregator(host: FakeHost, runtime: Option<Arc<FakeRuntime>>) -> Aggregator {
    aggregator_with(host, runtime, fast_settings())
}

pub fn aggregator_with(
    host: FakeHost,
    runtime: Option<Arc<FakeRuntime>>,
    settings: CollectSettings,
) -> Aggregator {
    let runtime = runtime.map(|r| r as Arc<dyn ContainerRuntime>);
    Aggregator::new(Arc::new(host), runtime, settings)
}

/// One running container with stats ready for its first cycle.
pub fn runtime_with_web() -> Arc<FakeRuntime> {
    let runtime = Arc::new(FakeRuntime::new(vec![container(WEB_ID, "web", "running")]));
    runtime.set_stats(WEB_ID, container_stats(100_000_000, 1_000_000_000));
    runtime
}
