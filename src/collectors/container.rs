// Container collector: identity for every container, live metrics for running ones

use super::CollectionContext;
use crate::calculator::{CounterSample, DeltaState, bytes_to_mb, format_uptime, ratio_percent};
use crate::error::{MonitorError, Result};
use crate::models::{Container, ContainerSnapshot, ContainerState, Domain, PortMapping, now_millis};
use crate::reader::{ContainerRecord, ContainerRuntime, RawContainerStats};
use futures_util::future::join_all;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

const SHORT_ID_LEN: usize = 12;

/// Collect all containers. Fails only when the runtime cannot be reached.
pub async fn collect(
    runtime: Option<&dyn ContainerRuntime>,
    ctx: &CollectionContext,
) -> Result<ContainerSnapshot> {
    let runtime =
        runtime.ok_or_else(|| MonitorError::unavailable(Domain::Container, "no runtime configured"))?;
    let records = list(runtime).await?;

    let running: Vec<&ContainerRecord> = records
        .iter()
        .filter(|r| ContainerState::from_docker(&r.state).is_running())
        .collect();
    let stats = fetch_stats(runtime, &running).await;

    let now = chrono::Utc::now().timestamp();
    let mut containers: Vec<Container> = records.iter().map(|r| identity(r, now)).collect();

    let mut deltas = ctx.deltas().await;
    for (record, container) in records.iter().zip(containers.iter_mut()) {
        if let Some(s) = stats.get(record.id.as_str()) {
            apply_live_stats(container, &record.id, s, &mut deltas);
        }
    }
    let present: HashSet<String> = running.iter().map(|r| r.id.clone()).collect();
    let pruned = deltas.retain_present(&present);
    if pruned > 0 {
        tracing::debug!(pruned, "dropped cpu baselines for vanished containers");
    }
    drop(deltas);

    let running_count = containers.iter().filter(|c| c.state.is_running()).count();
    Ok(ContainerSnapshot {
        available: true,
        total_count: containers.len(),
        running_count,
        containers,
        timestamp: now_millis(),
    })
}

/// Look up one container by full id or id prefix; the first match wins.
/// Baselines are updated but not pruned.
pub async fn detail(
    runtime: Option<&dyn ContainerRuntime>,
    ctx: &CollectionContext,
    id: &str,
) -> Result<Option<Container>> {
    let runtime =
        runtime.ok_or_else(|| MonitorError::unavailable(Domain::Container, "no runtime configured"))?;
    let records = list(runtime).await?;
    let Some(record) = find_by_prefix(&records, id) else {
        return Ok(None);
    };

    let mut container = identity(record, chrono::Utc::now().timestamp());
    if container.state.is_running() {
        match runtime.container_stats(&record.id).await {
            Ok(s) => {
                let mut deltas = ctx.deltas().await;
                apply_live_stats(&mut container, &record.id, &s, &mut deltas);
            }
            Err(e) => {
                tracing::debug!(error = %e, container = %container.name, "container stats unavailable");
            }
        }
    }
    Ok(Some(container))
}

pub fn find_by_prefix<'a>(records: &'a [ContainerRecord], id: &str) -> Option<&'a ContainerRecord> {
    if id.is_empty() {
        return None;
    }
    records
        .iter()
        .find(|r| r.id == id)
        .or_else(|| records.iter().find(|r| r.id.starts_with(id)))
}

async fn list(runtime: &dyn ContainerRuntime) -> Result<Vec<ContainerRecord>> {
    runtime
        .ping()
        .await
        .map_err(|e| MonitorError::unavailable(Domain::Container, e))?;
    runtime
        .list_containers()
        .await
        .map_err(|e| MonitorError::unavailable(Domain::Container, e))
}

/// Stats for each running container, keyed by full id. Failed fetches are absent.
async fn fetch_stats<'a>(
    runtime: &dyn ContainerRuntime,
    running: &[&'a ContainerRecord],
) -> HashMap<&'a str, RawContainerStats> {
    let results = join_all(running.iter().copied().map(|r| async move {
        (r.id.as_str(), runtime.container_stats(&r.id).await)
    }))
    .await;

    let mut stats = HashMap::with_capacity(results.len());
    for (id, result) in results {
        match result {
            Ok(s) => {
                stats.insert(id, s);
            }
            Err(e) => {
                tracing::debug!(error = %e, container = %short_id(id), "container stats unavailable");
            }
        }
    }
    stats
}

fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

fn identity(r: &ContainerRecord, now_secs: i64) -> Container {
    let id = short_id(&r.id);
    let name = r
        .names
        .first()
        .map(|n| n.trim_start_matches('/').to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| id.clone());
    let elapsed = Duration::from_secs(now_secs.saturating_sub(r.created).max(0) as u64);
    Container {
        id,
        name,
        image: r.image.clone(),
        status: r.status.clone(),
        state: ContainerState::from_docker(&r.state),
        ports: r
            .ports
            .iter()
            .map(|p| PortMapping {
                private_port: p.private_port,
                public_port: p.public_port.unwrap_or(0),
                type_: p.protocol.clone().unwrap_or_default(),
                ip: p.ip.clone().unwrap_or_default(),
            })
            .collect(),
        created: r.created,
        uptime: format_uptime(elapsed),
        ..Default::default()
    }
}

fn apply_live_stats(c: &mut Container, id: &str, s: &RawContainerStats, deltas: &mut DeltaState) {
    let num_cpus = s
        .online_cpus
        .filter(|n| *n > 0)
        .unwrap_or_else(|| s.percpu_count.max(1) as u32);
    c.cpu_percent = deltas.observe(
        id,
        CounterSample {
            cpu_total: s.cpu_total_usage,
            system: s.system_usage,
        },
        num_cpus,
    );

    c.memory_usage_mb = bytes_to_mb(s.memory_usage);
    c.memory_limit_mb = bytes_to_mb(s.memory_limit);
    c.memory_percent = ratio_percent(s.memory_usage, s.memory_limit);

    let (rx, tx) = s
        .networks
        .iter()
        .fold((0u64, 0u64), |(rx, tx), (r, t)| (rx.saturating_add(*r), tx.saturating_add(*t)));
    c.net_input_mb = bytes_to_mb(rx);
    c.net_output_mb = bytes_to_mb(tx);

    let mut read = 0u64;
    let mut write = 0u64;
    for (op, value) in &s.block_io {
        if op.eq_ignore_ascii_case("read") {
            read = read.saturating_add(*value);
        } else if op.eq_ignore_ascii_case("write") {
            write = write.saturating_add(*value);
        }
    }
    c.block_input_mb = bytes_to_mb(read);
    c.block_output_mb = bytes_to_mb(write);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::RawPortMapping;
    use crate::reader::fake::FakeRuntime;

    fn record(id: &str, name: &str, state: &str) -> ContainerRecord {
        ContainerRecord {
            id: id.into(),
            names: vec![format!("/{}", name)],
            image: "nginx:latest".into(),
            status: "Up 2 hours".into(),
            state: state.into(),
            ports: vec![RawPortMapping {
                private_port: 80,
                public_port: Some(8080),
                protocol: Some("tcp".into()),
                ip: Some("0.0.0.0".into()),
            }],
            created: 0,
        }
    }

    fn stats(cpu_total: u64, system: u64) -> RawContainerStats {
        RawContainerStats {
            cpu_total_usage: cpu_total,
            system_usage: system,
            online_cpus: Some(2),
            percpu_count: 2,
            memory_usage: 256 * 1024 * 1024,
            memory_limit: 512 * 1024 * 1024,
            networks: vec![(1024 * 1024, 2 * 1024 * 1024), (1024 * 1024, 0)],
            block_io: vec![
                ("Read".into(), 3 * 1024 * 1024),
                ("write".into(), 1024 * 1024),
                ("sync".into(), 99),
            ],
        }
    }

    const ID_A: &str = "aaaaaaaaaaaa1111111111111111111111111111111111111111111111111111";
    const ID_B: &str = "bbbbbbbbbbbb2222222222222222222222222222222222222222222222222222";

    #[tokio::test]
    async fn unreachable_runtime_is_unavailable() {
        let runtime = FakeRuntime::unreachable();
        let ctx = CollectionContext::new();
        let err = collect(Some(&runtime), &ctx).await.unwrap_err();
        assert!(matches!(
            err,
            MonitorError::SourceUnavailable {
                domain: Domain::Container,
                ..
            }
        ));
        assert!(collect(None, &ctx).await.is_err());
    }

    #[tokio::test]
    async fn stopped_containers_keep_identity_without_live_metrics() {
        let runtime = FakeRuntime::new(vec![record(ID_A, "web", "exited")]);
        runtime.set_stats(ID_A, stats(100, 1000));
        let ctx = CollectionContext::new();
        let snap = collect(Some(&runtime), &ctx).await.unwrap();
        assert!(snap.available);
        assert_eq!(snap.total_count, 1);
        assert_eq!(snap.running_count, 0);
        let c = &snap.containers[0];
        assert_eq!(c.id, "aaaaaaaaaaaa");
        assert_eq!(c.name, "web");
        assert_eq!(c.state, ContainerState::Exited);
        assert_eq!(c.ports[0].public_port, 8080);
        assert_eq!(c.memory_usage_mb, 0.0);
        assert!(ctx.deltas().await.is_empty());
    }

    #[tokio::test]
    async fn failed_stats_fetch_leaves_metrics_at_zero() {
        let runtime = FakeRuntime::new(vec![record(ID_A, "web", "running")]);
        let ctx = CollectionContext::new();
        let snap = collect(Some(&runtime), &ctx).await.unwrap();
        let c = &snap.containers[0];
        assert_eq!(c.name, "web");
        assert_eq!(c.cpu_percent, 0.0);
        assert_eq!(c.memory_limit_mb, 0.0);
        assert_eq!(snap.running_count, 1);
    }

    #[tokio::test]
    async fn live_metrics_and_cpu_from_second_cycle() {
        let runtime = FakeRuntime::new(vec![record(ID_A, "web", "running")]);
        let ctx = CollectionContext::new();

        runtime.set_stats(ID_A, stats(50_000_000, 500_000_000));
        let first = collect(Some(&runtime), &ctx).await.unwrap();
        let c = &first.containers[0];
        assert_eq!(c.cpu_percent, 0.0);
        assert_eq!(c.memory_usage_mb, 256.0);
        assert_eq!(c.memory_limit_mb, 512.0);
        assert_eq!(c.memory_percent, 50.0);
        assert_eq!(c.net_input_mb, 2.0);
        assert_eq!(c.net_output_mb, 2.0);
        assert_eq!(c.block_input_mb, 3.0);
        assert_eq!(c.block_output_mb, 1.0);

        runtime.set_stats(ID_A, stats(100_000_000, 1_000_000_000));
        let second = collect(Some(&runtime), &ctx).await.unwrap();
        assert!((second.containers[0].cpu_percent - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn vanished_containers_are_pruned_from_deltas() {
        let runtime = FakeRuntime::new(vec![
            record(ID_A, "web", "running"),
            record(ID_B, "db", "running"),
        ]);
        runtime.set_stats(ID_A, stats(1, 1));
        runtime.set_stats(ID_B, stats(1, 1));
        let ctx = CollectionContext::new();
        collect(Some(&runtime), &ctx).await.unwrap();
        assert_eq!(ctx.deltas().await.len(), 2);

        runtime.set_containers(vec![record(ID_A, "web", "running")]);
        collect(Some(&runtime), &ctx).await.unwrap();
        let deltas = ctx.deltas().await;
        assert!(deltas.contains(ID_A));
        assert!(!deltas.contains(ID_B));
    }

    #[test]
    fn find_by_prefix_prefers_exact_then_first_prefix() {
        let records = vec![
            record("abc111", "one", "running"),
            record("abc222", "two", "running"),
            record("abc", "three", "running"),
        ];
        assert_eq!(find_by_prefix(&records, "abc").unwrap().id, "abc");
        assert_eq!(find_by_prefix(&records, "abc2").unwrap().id, "abc222");
        assert_eq!(find_by_prefix(&records[..2], "abc").unwrap().id, "abc111");
        assert!(find_by_prefix(&records, "zzz").is_none());
        assert!(find_by_prefix(&records, "").is_none());
    }

    #[tokio::test]
    async fn detail_resolves_short_id() {
        let runtime = FakeRuntime::new(vec![
            record(ID_A, "web", "running"),
            record(ID_B, "db", "exited"),
        ]);
        runtime.set_stats(ID_A, stats(10, 10));
        let ctx = CollectionContext::new();
        let c = detail(Some(&runtime), &ctx, "bbbbbbbbbbbb")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(c.name, "db");
        let c = detail(Some(&runtime), &ctx, "aaaa").await.unwrap().unwrap();
        assert_eq!(c.memory_percent, 50.0);
        assert!(detail(Some(&runtime), &ctx, "cccc").await.unwrap().is_none());
    }

    #[test]
    fn identity_strips_leading_slash_and_formats_uptime() {
        let mut r = record(ID_A, "web", "running");
        r.created = 1_000;
        let c = identity(&r, 1_000 + 3 * 3600 + 5 * 60);
        assert_eq!(c.name, "web");
        assert_eq!(c.uptime, "3h 5m");
        r.names.clear();
        assert_eq!(identity(&r, 1_000).name, "aaaaaaaaaaaa");
    }
}
