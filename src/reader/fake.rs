// Scripted in-memory readers for tests and demos.
//
// A `None` field makes the corresponding read fail.

use super::*;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Default)]
pub struct FakeHost {
    pub cpu_sample: Option<CpuUsageSample>,
    /// Simulated sampling latency; applied before `sample_cpu` answers.
    pub cpu_delay: Duration,
    pub cpu_count: Option<u32>,
    pub cpu_model: Option<String>,
    pub load: Option<LoadAverage>,
    pub memory: Option<VirtualMemory>,
    pub swap: Option<SwapMemory>,
    pub partitions: Option<Vec<RawPartition>>,
    /// Keyed by mountpoint; a missing entry fails that usage read.
    pub usage: HashMap<String, PartitionUsage>,
    pub interfaces: Option<Vec<RawInterface>>,
    pub counters: Option<Vec<IoCounters>>,
    pub processes: Option<Vec<RawProcess>>,
    pub total_memory: Option<u64>,
    pub sockets: Option<Vec<RawSocket>>,
    /// Keyed by pid; a missing entry fails that lookup.
    pub process_names: HashMap<u32, String>,
    pub host: Option<HostInfo>,
}

fn scripted<T: Clone>(value: &Option<T>, what: &str) -> anyhow::Result<T> {
    value
        .clone()
        .ok_or_else(|| anyhow::anyhow!("fake {} read failed", what))
}

impl FakeHost {
    /// A host where every read succeeds with small, plausible values.
    pub fn healthy() -> Self {
        Self {
            cpu_sample: Some(CpuUsageSample {
                aggregate: 12.5,
                per_core: vec![10.0, 15.0],
            }),
            cpu_delay: Duration::ZERO,
            cpu_count: Some(2),
            cpu_model: Some("Fake CPU @ 3.00GHz".into()),
            load: Some(LoadAverage {
                one: 0.5,
                five: 0.25,
                fifteen: 0.1,
            }),
            memory: Some(VirtualMemory {
                total: 8 * 1024 * 1024 * 1024,
                used: 2 * 1024 * 1024 * 1024,
                available: 6 * 1024 * 1024 * 1024,
                cached: 512 * 1024 * 1024,
                buffers: 64 * 1024 * 1024,
            }),
            swap: Some(SwapMemory {
                total: 1024 * 1024 * 1024,
                used: 0,
            }),
            partitions: Some(vec![RawPartition {
                device: "/dev/sda1".into(),
                mountpoint: "/".into(),
                fstype: "ext4".into(),
            }]),
            usage: HashMap::from([(
                "/".to_string(),
                PartitionUsage {
                    total: 100,
                    used: 40,
                    free: 60,
                },
            )]),
            interfaces: Some(vec![
                RawInterface {
                    name: "lo".into(),
                    addrs: vec!["127.0.0.1".into()],
                },
                RawInterface {
                    name: "eth0".into(),
                    addrs: vec!["10.0.0.2".into()],
                },
            ]),
            counters: Some(vec![IoCounters {
                name: "eth0".into(),
                bytes_sent: 1000,
                bytes_recv: 2000,
                packets_sent: 10,
                packets_recv: 20,
            }]),
            processes: Some(vec![RawProcess {
                pid: 1,
                name: Some("init".into()),
                user: Some("root".into()),
                cpu_percent: Some(0.5),
                memory_bytes: Some(4 * 1024 * 1024),
                status: Some("sleeping".into()),
                command: Some("/sbin/init".into()),
            }]),
            total_memory: Some(8 * 1024 * 1024 * 1024),
            sockets: Some(vec![RawSocket {
                protocol: Protocol::Tcp,
                local_addr: "0.0.0.0".into(),
                local_port: 22,
                state: SocketState::Listen,
                pid: 1,
            }]),
            process_names: HashMap::from([(1, "sshd".to_string())]),
            host: Some(HostInfo {
                hostname: "fakehost".into(),
                os: "linux".into(),
                kernel: "6.1.0".into(),
                uptime_secs: 3600,
            }),
        }
    }
}

#[async_trait]
impl HostReader for FakeHost {
    async fn sample_cpu(&self, _window: Duration) -> anyhow::Result<CpuUsageSample> {
        if !self.cpu_delay.is_zero() {
            tokio::time::sleep(self.cpu_delay).await;
        }
        scripted(&self.cpu_sample, "cpu sample")
    }

    async fn cpu_count(&self) -> anyhow::Result<u32> {
        scripted(&self.cpu_count, "cpu count")
    }

    async fn cpu_model(&self) -> anyhow::Result<String> {
        scripted(&self.cpu_model, "cpu model")
    }

    async fn load_average(&self) -> anyhow::Result<LoadAverage> {
        scripted(&self.load, "load average")
    }

    async fn virtual_memory(&self) -> anyhow::Result<VirtualMemory> {
        scripted(&self.memory, "virtual memory")
    }

    async fn swap_memory(&self) -> anyhow::Result<SwapMemory> {
        scripted(&self.swap, "swap")
    }

    async fn partitions(&self) -> anyhow::Result<Vec<RawPartition>> {
        scripted(&self.partitions, "partitions")
    }

    async fn partition_usage(&self, mountpoint: &str) -> anyhow::Result<PartitionUsage> {
        self.usage
            .get(mountpoint)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("fake usage read failed for {}", mountpoint))
    }

    async fn interfaces(&self) -> anyhow::Result<Vec<RawInterface>> {
        scripted(&self.interfaces, "interfaces")
    }

    async fn io_counters(&self) -> anyhow::Result<Vec<IoCounters>> {
        scripted(&self.counters, "io counters")
    }

    async fn processes(&self) -> anyhow::Result<Vec<RawProcess>> {
        scripted(&self.processes, "processes")
    }

    async fn total_memory(&self) -> anyhow::Result<u64> {
        scripted(&self.total_memory, "total memory")
    }

    async fn sockets(&self) -> anyhow::Result<Vec<RawSocket>> {
        scripted(&self.sockets, "sockets")
    }

    async fn process_name(&self, pid: u32) -> anyhow::Result<String> {
        self.process_names
            .get(&pid)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("fake process {} not found", pid))
    }

    async fn host_info(&self) -> anyhow::Result<HostInfo> {
        scripted(&self.host, "host info")
    }
}

/// Container runtime whose listing and stats can be swapped between cycles.
#[derive(Debug, Default)]
pub struct FakeRuntime {
    reachable: Mutex<bool>,
    containers: Mutex<Vec<ContainerRecord>>,
    stats: Mutex<HashMap<String, RawContainerStats>>,
}

impl FakeRuntime {
    pub fn new(containers: Vec<ContainerRecord>) -> Self {
        Self {
            reachable: Mutex::new(true),
            containers: Mutex::new(containers),
            stats: Mutex::new(HashMap::new()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: Mutex::new(false),
            ..Default::default()
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        if let Ok(mut guard) = self.reachable.lock() {
            *guard = reachable;
        }
    }

    pub fn set_containers(&self, containers: Vec<ContainerRecord>) {
        if let Ok(mut guard) = self.containers.lock() {
            *guard = containers;
        }
    }

    pub fn set_stats(&self, id: &str, stats: RawContainerStats) {
        if let Ok(mut guard) = self.stats.lock() {
            guard.insert(id.to_string(), stats);
        }
    }

    pub fn clear_stats(&self, id: &str) {
        if let Ok(mut guard) = self.stats.lock() {
            guard.remove(id);
        }
    }

    fn is_reachable(&self) -> bool {
        self.reachable.lock().map(|g| *g).unwrap_or(false)
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn ping(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.is_reachable(), "fake runtime unreachable");
        Ok(())
    }

    async fn list_containers(&self) -> anyhow::Result<Vec<ContainerRecord>> {
        anyhow::ensure!(self.is_reachable(), "fake runtime unreachable");
        self.containers
            .lock()
            .map(|g| g.clone())
            .map_err(|e| anyhow::anyhow!("fake runtime lock poisoned: {}", e))
    }

    async fn container_stats(&self, id: &str) -> anyhow::Result<RawContainerStats> {
        anyhow::ensure!(self.is_reachable(), "fake runtime unreachable");
        let stats = self
            .stats
            .lock()
            .map_err(|e| anyhow::anyhow!("fake runtime lock poisoned: {}", e))?;
        stats
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no stats for container {}", id))
    }
}
