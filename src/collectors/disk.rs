// Disk partition collector

use super::field_or_default;
use crate::calculator::ratio_percent;
use crate::error::{MonitorError, Result};
use crate::models::{DiskSnapshot, Domain, Partition, now_millis};
use crate::reader::HostReader;

pub async fn collect(host: &dyn HostReader) -> Result<DiskSnapshot> {
    let raw = host
        .partitions()
        .await
        .map_err(|e| MonitorError::unavailable(Domain::Disk, e))?;

    let mut partitions = Vec::with_capacity(raw.len());
    for p in raw {
        let usage = field_or_default(
            host.partition_usage(&p.mountpoint).await,
            Domain::Disk,
            "partition_usage",
        );
        partitions.push(Partition {
            device: p.device,
            mountpoint: p.mountpoint,
            fstype: p.fstype,
            total: usage.total,
            used: usage.used,
            free: usage.free,
            used_percent: ratio_percent(usage.used, usage.total),
        });
    }

    Ok(DiskSnapshot {
        partitions: filter_and_sort(partitions),
        timestamp: now_millis(),
    })
}

/// Drop zero-capacity (pseudo) filesystems and order by used% descending.
/// The sort is stable: equal usage keeps listing order.
pub fn filter_and_sort(mut partitions: Vec<Partition>) -> Vec<Partition> {
    partitions.retain(|p| p.total > 0);
    partitions.sort_by(|a, b| b.used_percent.total_cmp(&a.used_percent));
    partitions
}
