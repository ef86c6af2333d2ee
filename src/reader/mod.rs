// Resource reader capability: raw host and container-runtime data.
//
// Every method is independently fallible. Collectors turn a failed read into
// a zero value for that field; they never abort because one read failed.

/// In-memory `HostReader` and `ContainerRuntime` implementations. Part of
/// the public API so downstream crates can drive an `Aggregator` without a
/// live host or Docker daemon.
pub mod fake;

use async_trait::async_trait;
use std::time::Duration;

/// Aggregate and per-core CPU usage sampled over one window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuUsageSample {
    pub aggregate: f64,
    pub per_core: Vec<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VirtualMemory {
    pub total: u64,
    pub used: u64,
    pub available: u64,
    pub cached: u64,
    pub buffers: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SwapMemory {
    pub total: u64,
    pub used: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPartition {
    pub device: String,
    pub mountpoint: String,
    pub fstype: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PartitionUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawInterface {
    pub name: String,
    pub addrs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IoCounters {
    pub name: String,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
}

/// One process as listed by the host. Any field may be unreadable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawProcess {
    pub pid: u32,
    pub name: Option<String>,
    pub user: Option<String>,
    pub cpu_percent: Option<f64>,
    /// Resident set size in bytes.
    pub memory_bytes: Option<u64>,
    pub status: Option<String>,
    pub command: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Protocol {
    Tcp,
    Udp,
    Tcp6,
    Udp6,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Tcp6 => "tcp6",
            Protocol::Udp6 => "udp6",
        }
    }
}

/// Socket state as reported by the host. UDP sockets carry no connection
/// state, so readers report every UDP socket as `Bound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    Listen,
    Bound,
    Established,
    Other,
}

impl SocketState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SocketState::Listen => "LISTEN",
            SocketState::Bound => "BOUND",
            SocketState::Established => "ESTABLISHED",
            SocketState::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawSocket {
    pub protocol: Protocol,
    pub local_addr: String,
    pub local_port: u16,
    pub state: SocketState,
    /// 0 when the owner is unknown.
    pub pid: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostInfo {
    pub hostname: String,
    pub os: String,
    pub kernel: String,
    pub uptime_secs: u64,
}

/// Host-side capability surface (CPU, memory, disks, network, processes, sockets).
#[async_trait]
pub trait HostReader: Send + Sync {
    /// Blocks for `window` to sample usage; aggregate and per-core come from one sample.
    async fn sample_cpu(&self, window: Duration) -> anyhow::Result<CpuUsageSample>;
    async fn cpu_count(&self) -> anyhow::Result<u32>;
    async fn cpu_model(&self) -> anyhow::Result<String>;
    async fn load_average(&self) -> anyhow::Result<LoadAverage>;

    async fn virtual_memory(&self) -> anyhow::Result<VirtualMemory>;
    async fn swap_memory(&self) -> anyhow::Result<SwapMemory>;

    async fn partitions(&self) -> anyhow::Result<Vec<RawPartition>>;
    async fn partition_usage(&self, mountpoint: &str) -> anyhow::Result<PartitionUsage>;

    async fn interfaces(&self) -> anyhow::Result<Vec<RawInterface>>;
    async fn io_counters(&self) -> anyhow::Result<Vec<IoCounters>>;

    async fn processes(&self) -> anyhow::Result<Vec<RawProcess>>;
    async fn total_memory(&self) -> anyhow::Result<u64>;

    async fn sockets(&self) -> anyhow::Result<Vec<RawSocket>>;
    async fn process_name(&self, pid: u32) -> anyhow::Result<String>;

    async fn host_info(&self) -> anyhow::Result<HostInfo>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPortMapping {
    pub private_port: u16,
    pub public_port: Option<u16>,
    pub protocol: Option<String>,
    pub ip: Option<String>,
}

/// One container as listed by the runtime.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerRecord {
    /// Full id.
    pub id: String,
    pub names: Vec<String>,
    pub image: String,
    pub status: String,
    pub state: String,
    pub ports: Vec<RawPortMapping>,
    /// Unix seconds.
    pub created: i64,
}

/// Raw cumulative stats blob for one running container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawContainerStats {
    /// Cumulative container CPU time (ns).
    pub cpu_total_usage: u64,
    /// Cumulative host CPU time (ns).
    pub system_usage: u64,
    pub online_cpus: Option<u32>,
    pub percpu_count: usize,
    pub memory_usage: u64,
    pub memory_limit: u64,
    /// Per-interface (rx_bytes, tx_bytes).
    pub networks: Vec<(u64, u64)>,
    /// Per-op block IO bytes, e.g. ("read", 4096).
    pub block_io: Vec<(String, u64)>,
}

/// Container runtime capability surface.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Fails when the runtime cannot be reached at all.
    async fn ping(&self) -> anyhow::Result<()>;
    /// All containers, including stopped ones.
    async fn list_containers(&self) -> anyhow::Result<Vec<ContainerRecord>>;
    async fn container_stats(&self, id: &str) -> anyhow::Result<RawContainerStats>;
}
