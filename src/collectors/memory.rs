// Memory and swap collector

use super::field_or_default;
use crate::calculator::ratio_percent;
use crate::error::Result;
use crate::models::{Domain, MemorySnapshot, now_millis};
use crate::reader::HostReader;

pub async fn collect(host: &dyn HostReader) -> Result<MemorySnapshot> {
    let vmem = field_or_default(host.virtual_memory().await, Domain::Memory, "virtual_memory");
    let swap = field_or_default(host.swap_memory().await, Domain::Memory, "swap");

    Ok(MemorySnapshot {
        total: vmem.total,
        used: vmem.used,
        available: vmem.available,
        cached: vmem.cached,
        buffers: vmem.buffers,
        used_percent: ratio_percent(vmem.used, vmem.total),
        swap_total: swap.total,
        swap_used: swap.used,
        swap_percent: ratio_percent(swap.used, swap.total),
        timestamp: now_millis(),
    })
}
