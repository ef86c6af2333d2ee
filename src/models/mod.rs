// Domain models: one typed snapshot per domain plus the composite

mod container;
mod network;
mod process;
mod storage;
mod system;

pub use container::{Container, ContainerSnapshot, ContainerState, PortMapping};
pub use network::{Interface, ListeningSocket, NetworkSnapshot, PortSnapshot};
pub use process::{ProcessDetail, ProcessSnapshot};
pub use storage::{DiskSnapshot, Partition};
pub use system::{CpuSnapshot, Domain, DomainSnapshot, MemorySnapshot, Snapshot, SystemSnapshot};

/// Milliseconds since the Unix epoch; 0 if the clock is before the epoch.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}
