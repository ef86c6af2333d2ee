// Process collector: one listing, two top-N views

use super::field_or_default;
use crate::calculator::{bytes_to_mb, clamp_percent, ratio_percent};
use crate::error::{MonitorError, Result};
use crate::models::{Domain, ProcessDetail, ProcessSnapshot, now_millis};
use crate::reader::{HostReader, RawProcess};
use std::cmp::Ordering;

pub async fn collect(host: &dyn HostReader, top_n: usize) -> Result<ProcessSnapshot> {
    let raw = host
        .processes()
        .await
        .map_err(|e| MonitorError::unavailable(Domain::Process, e))?;
    let total_memory = field_or_default(host.total_memory().await, Domain::Process, "total_memory");

    let mut details: Vec<ProcessDetail> = raw
        .into_iter()
        .map(|p| to_detail(p, total_memory))
        .collect();
    // ties in the top views fall back to pid order, whatever order the reader used
    details.sort_by_key(|d| d.pid);

    Ok(ProcessSnapshot {
        total_processes: details.len(),
        top_cpu: top_by(&details, top_n, |a, b| b.cpu_percent.total_cmp(&a.cpu_percent)),
        top_memory: top_by(&details, top_n, |a, b| b.memory_mb.total_cmp(&a.memory_mb)),
        timestamp: now_millis(),
    })
}

fn to_detail(p: RawProcess, total_memory: u64) -> ProcessDetail {
    let memory_bytes = p.memory_bytes.unwrap_or_default();
    ProcessDetail {
        pid: p.pid,
        name: p.name.unwrap_or_default(),
        user: p.user.unwrap_or_default(),
        cpu_percent: clamp_percent(p.cpu_percent.unwrap_or_default()),
        memory_mb: bytes_to_mb(memory_bytes),
        memory_percent: ratio_percent(memory_bytes, total_memory),
        status: p.status.unwrap_or_default(),
        command: p.command.unwrap_or_default(),
    }
}

/// Stable sort by `cmp`, truncated to `min(n, len)`.
pub fn top_by<F>(details: &[ProcessDetail], n: usize, cmp: F) -> Vec<ProcessDetail>
where
    F: FnMut(&ProcessDetail, &ProcessDetail) -> Ordering,
{
    let mut sorted = details.to_vec();
    sorted.sort_by(cmp);
    sorted.truncate(n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::fake::FakeHost;

    fn raw(pid: u32, cpu: f64, mem_mb: u64) -> RawProcess {
        RawProcess {
            pid,
            name: Some(format!("p{}", pid)),
            user: Some("root".into()),
            cpu_percent: Some(cpu),
            memory_bytes: Some(mem_mb * 1024 * 1024),
            status: Some("running".into()),
            command: Some(format!("/bin/p{}", pid)),
        }
    }

    fn host_with(processes: Vec<RawProcess>) -> FakeHost {
        FakeHost {
            processes: Some(processes),
            total_memory: Some(1000 * 1024 * 1024),
            ..FakeHost::healthy()
        }
    }

    #[tokio::test]
    async fn top_views_are_sorted_and_truncated_independently() {
        let host = host_with(vec![
            raw(1, 5.0, 300),
            raw(2, 50.0, 10),
            raw(3, 20.0, 100),
            raw(4, 1.0, 500),
        ]);
        let snap = collect(&host, 2).await.unwrap();
        assert_eq!(snap.total_processes, 4);
        let cpu: Vec<u32> = snap.top_cpu.iter().map(|p| p.pid).collect();
        let mem: Vec<u32> = snap.top_memory.iter().map(|p| p.pid).collect();
        assert_eq!(cpu, vec![2, 3]);
        assert_eq!(mem, vec![4, 1]);
        assert_eq!(snap.top_memory[0].memory_percent, 50.0);
    }

    #[tokio::test]
    async fn top_n_larger_than_list_returns_all() {
        let host = host_with(vec![raw(1, 5.0, 1), raw(2, 6.0, 2)]);
        let snap = collect(&host, 10).await.unwrap();
        assert_eq!(snap.top_cpu.len(), 2);
        assert_eq!(snap.top_memory.len(), 2);
    }

    #[tokio::test]
    async fn tie_order_depends_only_on_pid() {
        let listings = [
            vec![raw(7, 10.0, 5), raw(3, 10.0, 5), raw(9, 10.0, 5)],
            vec![raw(9, 10.0, 5), raw(7, 10.0, 5), raw(3, 10.0, 5)],
        ];
        for listing in listings {
            let snap = collect(&host_with(listing), 3).await.unwrap();
            let cpu: Vec<u32> = snap.top_cpu.iter().map(|p| p.pid).collect();
            let mem: Vec<u32> = snap.top_memory.iter().map(|p| p.pid).collect();
            assert_eq!(cpu, vec![3, 7, 9]);
            assert_eq!(mem, vec![3, 7, 9]);
        }
    }

    #[tokio::test]
    async fn unreadable_fields_become_zero_values() {
        let host = host_with(vec![RawProcess {
            pid: 42,
            ..Default::default()
        }]);
        let snap = collect(&host, 5).await.unwrap();
        let p = &snap.top_cpu[0];
        assert_eq!(p.pid, 42);
        assert_eq!(p.name, "");
        assert_eq!(p.cpu_percent, 0.0);
        assert_eq!(p.memory_mb, 0.0);
    }

    #[tokio::test]
    async fn per_process_cpu_is_clamped() {
        let host = host_with(vec![raw(1, 390.0, 1)]);
        let snap = collect(&host, 1).await.unwrap();
        assert_eq!(snap.top_cpu[0].cpu_percent, 100.0);
    }
}
