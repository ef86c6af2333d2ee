// Host identity, CPU, memory and the composite snapshot

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{ContainerSnapshot, DiskSnapshot, NetworkSnapshot, PortSnapshot, ProcessSnapshot};

/// Static-ish host identity (hostname, OS, kernel) plus uptime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSnapshot {
    pub hostname: String,
    pub os: String,
    pub kernel: String,
    pub uptime_secs: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuSnapshot {
    pub usage_percent: f64,
    /// Index is the core id.
    pub per_core_usage: Vec<f64>,
    pub core_count: u32,
    pub model: String,
    pub load_avg1: f64,
    pub load_avg5: f64,
    pub load_avg15: f64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySnapshot {
    pub total: u64,
    pub used: u64,
    pub available: u64,
    pub cached: u64,
    pub buffers: u64,
    pub used_percent: f64,
    pub swap_total: u64,
    pub swap_used: u64,
    pub swap_percent: f64,
    pub timestamp: u64,
}

/// Composite view of one collection cycle.
///
/// A `None` host slot means the domain could not be collected this cycle,
/// which is distinct from a populated snapshot full of zeros. The container
/// domain is always present and reports reachability through `available`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub timestamp: u64,
    pub system: Option<SystemSnapshot>,
    pub cpu: Option<CpuSnapshot>,
    pub memory: Option<MemorySnapshot>,
    pub disk: Option<DiskSnapshot>,
    pub network: Option<NetworkSnapshot>,
    pub process: Option<ProcessSnapshot>,
    pub port: Option<PortSnapshot>,
    pub container: ContainerSnapshot,
}

impl Snapshot {
    /// The composite timestamp followed by every present domain's timestamp.
    pub fn timestamps_mut(&mut self) -> impl Iterator<Item = &mut u64> {
        [
            Some(&mut self.timestamp),
            self.system.as_mut().map(|s| &mut s.timestamp),
            self.cpu.as_mut().map(|s| &mut s.timestamp),
            self.memory.as_mut().map(|s| &mut s.timestamp),
            self.disk.as_mut().map(|s| &mut s.timestamp),
            self.network.as_mut().map(|s| &mut s.timestamp),
            self.process.as_mut().map(|s| &mut s.timestamp),
            self.port.as_mut().map(|s| &mut s.timestamp),
            Some(&mut self.container.timestamp),
        ]
        .into_iter()
        .flatten()
    }
}

/// Collection domains, one per collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    System,
    Cpu,
    Memory,
    Disk,
    Network,
    Process,
    Port,
    Container,
}

impl Domain {
    pub const ALL: [Domain; 8] = [
        Domain::System,
        Domain::Cpu,
        Domain::Memory,
        Domain::Disk,
        Domain::Network,
        Domain::Process,
        Domain::Port,
        Domain::Container,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::System => "system",
            Domain::Cpu => "cpu",
            Domain::Memory => "memory",
            Domain::Disk => "disk",
            Domain::Network => "network",
            Domain::Process => "process",
            Domain::Port => "port",
            Domain::Container => "container",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    /// Accepts the canonical names plus the route aliases `ports` and `docker`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "system" => Ok(Domain::System),
            "cpu" => Ok(Domain::Cpu),
            "memory" | "mem" => Ok(Domain::Memory),
            "disk" => Ok(Domain::Disk),
            "network" | "net" => Ok(Domain::Network),
            "process" | "processes" => Ok(Domain::Process),
            "port" | "ports" => Ok(Domain::Port),
            "container" | "containers" | "docker" => Ok(Domain::Container),
            other => Err(format!("unknown domain `{other}`")),
        }
    }
}

/// A single domain's snapshot, as returned by a one-domain query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DomainSnapshot {
    System(SystemSnapshot),
    Cpu(CpuSnapshot),
    Memory(MemorySnapshot),
    Disk(DiskSnapshot),
    Network(NetworkSnapshot),
    Process(ProcessSnapshot),
    Port(PortSnapshot),
    Container(ContainerSnapshot),
}

impl DomainSnapshot {
    pub fn domain(&self) -> Domain {
        match self {
            DomainSnapshot::System(_) => Domain::System,
            DomainSnapshot::Cpu(_) => Domain::Cpu,
            DomainSnapshot::Memory(_) => Domain::Memory,
            DomainSnapshot::Disk(_) => Domain::Disk,
            DomainSnapshot::Network(_) => Domain::Network,
            DomainSnapshot::Process(_) => Domain::Process,
            DomainSnapshot::Port(_) => Domain::Port,
            DomainSnapshot::Container(_) => Domain::Container,
        }
    }
}
