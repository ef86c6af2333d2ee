// Host readings via sysinfo, sockets via netstat2

mod linux;

use crate::reader::{
    CpuUsageSample, HostInfo, HostReader, IoCounters, LoadAverage, PartitionUsage, Protocol,
    RawInterface, RawPartition, RawProcess, RawSocket, SocketState, SwapMemory, VirtualMemory,
};
use async_trait::async_trait;
use netstat2::{
    AddressFamilyFlags, ProtocolFlags, ProtocolSocketInfo, TcpState, get_sockets_info,
};
use std::sync::Arc;
use std::time::Duration;
use sysinfo::{
    CpuRefreshKind, Disks, Networks, Pid, ProcessesToUpdate, RefreshKind, System, Users,
};
use tracing::instrument;

/// Live host reader. The `cpu` handle only serves core count and model; usage
/// samples never touch the shared handles.
pub struct SysinfoRepo {
    cpu: Arc<std::sync::Mutex<System>>,
    sys: Arc<std::sync::Mutex<System>>,
    disks: Arc<std::sync::Mutex<Disks>>,
    networks: Arc<std::sync::Mutex<Networks>>,
    users: Arc<std::sync::Mutex<Users>>,
}

impl Default for SysinfoRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoRepo {
    pub fn new() -> Self {
        let mut cpu = System::new();
        cpu.refresh_cpu_all();
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_processes(ProcessesToUpdate::All, true);
        Self {
            cpu: Arc::new(std::sync::Mutex::new(cpu)),
            sys: Arc::new(std::sync::Mutex::new(sys)),
            disks: Arc::new(std::sync::Mutex::new(Disks::new_with_refreshed_list())),
            networks: Arc::new(std::sync::Mutex::new(Networks::new_with_refreshed_list())),
            users: Arc::new(std::sync::Mutex::new(Users::new_with_refreshed_list())),
        }
    }

    /// Run `f` against one of the shared sysinfo handles on the blocking pool.
    async fn with_blocking<S, T, F>(handle: &Arc<std::sync::Mutex<S>>, what: &'static str, f: F) -> anyhow::Result<T>
    where
        S: Send + 'static,
        T: Send + 'static,
        F: FnOnce(&mut S) -> anyhow::Result<T> + Send + 'static,
    {
        let handle = handle.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = handle
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo {} lock poisoned: {}", what, e))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }
}

#[async_trait]
impl HostReader for SysinfoRepo {
    /// Each call samples with its own `System`; no lock is held across the
    /// window, which is an async sleep between two short blocking refreshes.
    #[instrument(skip(self), fields(repo = "sysinfo", operation = "sample_cpu"))]
    async fn sample_cpu(&self, window: Duration) -> anyhow::Result<CpuUsageSample> {
        let sampler = tokio::task::spawn_blocking(|| {
            System::new_with_specifics(
                RefreshKind::nothing().with_cpu(CpuRefreshKind::nothing().with_cpu_usage()),
            )
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?;

        tokio::time::sleep(window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL)).await;

        tokio::task::spawn_blocking(move || {
            let mut sys = sampler;
            sys.refresh_cpu_usage();
            anyhow::ensure!(!sys.cpus().is_empty(), "no cpus reported");
            Ok(CpuUsageSample {
                aggregate: sys.global_cpu_usage() as f64,
                per_core: sys.cpus().iter().map(|c| c.cpu_usage() as f64).collect(),
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }

    async fn cpu_count(&self) -> anyhow::Result<u32> {
        Self::with_blocking(&self.cpu, "cpu", |sys| {
            let n = sys.cpus().len();
            anyhow::ensure!(n > 0, "no cpus reported");
            Ok(n as u32)
        })
        .await
    }

    async fn cpu_model(&self) -> anyhow::Result<String> {
        Self::with_blocking(&self.cpu, "cpu", |sys| {
            linux::read_cpu_model_linux()
                .or_else(|| {
                    sys.cpus()
                        .first()
                        .map(|c| c.brand().trim().to_string())
                        .filter(|s| !s.is_empty())
                })
                .ok_or_else(|| anyhow::anyhow!("cpu model not reported"))
        })
        .await
    }

    async fn load_average(&self) -> anyhow::Result<LoadAverage> {
        let load = System::load_average();
        Ok(LoadAverage {
            one: load.one,
            five: load.five,
            fifteen: load.fifteen,
        })
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "virtual_memory"))]
    async fn virtual_memory(&self) -> anyhow::Result<VirtualMemory> {
        Self::with_blocking(&self.sys, "memory", |sys| {
            sys.refresh_memory();
            let total = sys.total_memory();
            anyhow::ensure!(total > 0, "total memory not reported");
            let meminfo = linux::read_meminfo_linux();
            Ok(VirtualMemory {
                total,
                used: sys.used_memory(),
                available: sys.available_memory(),
                cached: meminfo.as_ref().map_or(0, |m| m.cached),
                buffers: meminfo.as_ref().map_or(0, |m| m.buffers),
            })
        })
        .await
    }

    async fn swap_memory(&self) -> anyhow::Result<SwapMemory> {
        Self::with_blocking(&self.sys, "memory", |sys| {
            sys.refresh_memory();
            Ok(SwapMemory {
                total: sys.total_swap(),
                used: sys.used_swap(),
            })
        })
        .await
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "partitions"))]
    async fn partitions(&self) -> anyhow::Result<Vec<RawPartition>> {
        Self::with_blocking(&self.disks, "disks", |disks| {
            disks.refresh(true);
            Ok(disks
                .list()
                .iter()
                .map(|d| RawPartition {
                    device: d.name().to_string_lossy().into_owned(),
                    mountpoint: d.mount_point().to_string_lossy().into_owned(),
                    fstype: d.file_system().to_string_lossy().into_owned(),
                })
                .collect())
        })
        .await
    }

    async fn partition_usage(&self, mountpoint: &str) -> anyhow::Result<PartitionUsage> {
        let mountpoint = mountpoint.to_string();
        Self::with_blocking(&self.disks, "disks", move |disks| {
            let disk = disks
                .list()
                .iter()
                .find(|d| d.mount_point().to_string_lossy() == mountpoint)
                .ok_or_else(|| anyhow::anyhow!("no usage for mountpoint {}", mountpoint))?;
            let total = disk.total_space();
            let free = disk.available_space();
            Ok(PartitionUsage {
                total,
                used: total.saturating_sub(free),
                free,
            })
        })
        .await
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "interfaces"))]
    async fn interfaces(&self) -> anyhow::Result<Vec<RawInterface>> {
        Self::with_blocking(&self.networks, "networks", |networks| {
            networks.refresh(true);
            let mut interfaces: Vec<RawInterface> = networks
                .list()
                .iter()
                .map(|(name, data)| RawInterface {
                    name: name.clone(),
                    addrs: data
                        .ip_networks()
                        .iter()
                        .map(|n| n.addr.to_string())
                        .collect(),
                })
                .collect();
            interfaces.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(interfaces)
        })
        .await
    }

    async fn io_counters(&self) -> anyhow::Result<Vec<IoCounters>> {
        Self::with_blocking(&self.networks, "networks", |networks| {
            networks.refresh(true);
            let mut counters: Vec<IoCounters> = networks
                .list()
                .iter()
                .map(|(name, data)| IoCounters {
                    name: name.clone(),
                    bytes_sent: data.total_transmitted(),
                    bytes_recv: data.total_received(),
                    packets_sent: data.total_packets_transmitted(),
                    packets_recv: data.total_packets_received(),
                })
                .collect();
            counters.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(counters)
        })
        .await
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "processes"))]
    async fn processes(&self) -> anyhow::Result<Vec<RawProcess>> {
        let users = self.users.clone();
        Self::with_blocking(&self.sys, "processes", move |sys| {
            sys.refresh_processes(ProcessesToUpdate::All, true);
            let mut users = users
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo users lock poisoned: {}", e))?;
            users.refresh();
            let mut processes: Vec<RawProcess> = sys
                .processes()
                .iter()
                .map(|(pid, p)| {
                    let command = p
                        .cmd()
                        .iter()
                        .map(|a| a.to_string_lossy())
                        .collect::<Vec<_>>()
                        .join(" ");
                    RawProcess {
                        pid: pid.as_u32(),
                        name: Some(p.name().to_string_lossy().into_owned()),
                        user: p
                            .user_id()
                            .and_then(|uid| users.get_user_by_id(uid))
                            .map(|u| u.name().to_string()),
                        status: Some(p.status().to_string()),
                        command: Some(command),
                        cpu_percent: Some(p.cpu_usage() as f64),
                        memory_bytes: Some(p.memory()),
                    }
                })
                .collect();
            // sysinfo keys processes by a HashMap; listing order is by pid
            processes.sort_by_key(|p| p.pid);
            Ok(processes)
        })
        .await
    }

    async fn total_memory(&self) -> anyhow::Result<u64> {
        Self::with_blocking(&self.sys, "memory", |sys| {
            let total = sys.total_memory();
            anyhow::ensure!(total > 0, "total memory not reported");
            Ok(total)
        })
        .await
    }

    #[instrument(skip(self), fields(repo = "netstat2", operation = "sockets"))]
    async fn sockets(&self) -> anyhow::Result<Vec<RawSocket>> {
        tokio::task::spawn_blocking(|| {
            let af = AddressFamilyFlags::IPV4 | AddressFamilyFlags::IPV6;
            let proto = ProtocolFlags::TCP | ProtocolFlags::UDP;
            let sockets = get_sockets_info(af, proto)
                .map_err(|e| anyhow::anyhow!("socket table: {}", e))?;
            Ok(sockets
                .into_iter()
                .map(|s| {
                    let pid = s.associated_pids.first().copied().unwrap_or(0);
                    match s.protocol_socket_info {
                        ProtocolSocketInfo::Tcp(tcp) => RawSocket {
                            protocol: if tcp.local_addr.is_ipv6() {
                                Protocol::Tcp6
                            } else {
                                Protocol::Tcp
                            },
                            local_addr: tcp.local_addr.to_string(),
                            local_port: tcp.local_port,
                            state: match tcp.state {
                                TcpState::Listen => SocketState::Listen,
                                TcpState::Established => SocketState::Established,
                                _ => SocketState::Other,
                            },
                            pid,
                        },
                        // UDP has no connection state, and the table does not say whether a peer is set.
                        ProtocolSocketInfo::Udp(udp) => RawSocket {
                            protocol: if udp.local_addr.is_ipv6() {
                                Protocol::Udp6
                            } else {
                                Protocol::Udp
                            },
                            local_addr: udp.local_addr.to_string(),
                            local_port: udp.local_port,
                            state: SocketState::Bound,
                            pid,
                        },
                    }
                })
                .collect())
        })
        .await
        .map_err(|e| anyhow::anyhow!("netstat2 task join: {}", e))?
    }

    async fn process_name(&self, pid: u32) -> anyhow::Result<String> {
        Self::with_blocking(&self.sys, "processes", move |sys| {
            let pid = Pid::from_u32(pid);
            if sys.process(pid).is_none() {
                sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), false);
            }
            sys.process(pid)
                .map(|p| p.name().to_string_lossy().into_owned())
                .ok_or_else(|| anyhow::anyhow!("process {} not found", pid))
        })
        .await
    }

    async fn host_info(&self) -> anyhow::Result<HostInfo> {
        Ok(HostInfo {
            hostname: System::host_name().unwrap_or_default(),
            os: System::long_os_version()
                .or_else(linux::read_os_pretty_name_linux)
                .unwrap_or_else(|| std::env::consts::OS.into()),
            kernel: System::kernel_version().unwrap_or_default(),
            uptime_secs: System::uptime(),
        })
    }
}
