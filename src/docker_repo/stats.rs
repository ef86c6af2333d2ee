// Flatten a Docker stats API response into the cumulative counters we keep.

use crate::reader::RawContainerStats;
use bollard::models::ContainerStatsResponse;

/// Exposed for unit tests. Fails only when the CPU section is missing entirely.
pub(crate) fn raw_stats(s: &ContainerStatsResponse) -> anyhow::Result<RawContainerStats> {
    let cpu_stats = s
        .cpu_stats
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("stats response has no cpu section"))?;
    let cpu_usage = cpu_stats.cpu_usage.as_ref();

    let memory_usage = s.memory_stats.as_ref().and_then(|m| m.usage).unwrap_or(0);
    let memory_limit = s.memory_stats.as_ref().and_then(|m| m.limit).unwrap_or(0);

    let networks = s
        .networks
        .as_ref()
        .map(|n| {
            n.values()
                .map(|v| (v.rx_bytes.unwrap_or(0), v.tx_bytes.unwrap_or(0)))
                .collect()
        })
        .unwrap_or_default();

    let block_io = s
        .blkio_stats
        .as_ref()
        .and_then(|b| b.io_service_bytes_recursive.as_ref())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| Some((e.op.clone()?, e.value.unwrap_or(0))))
                .collect()
        })
        .unwrap_or_default();

    Ok(RawContainerStats {
        cpu_total_usage: cpu_usage.and_then(|u| u.total_usage).unwrap_or(0),
        system_usage: cpu_stats.system_cpu_usage.unwrap_or(0),
        online_cpus: cpu_stats.online_cpus,
        percpu_count: cpu_usage
            .and_then(|u| u.percpu_usage.as_ref())
            .map_or(0, |p| p.len()),
        memory_usage,
        memory_limit,
        networks,
        block_io,
    })
}
