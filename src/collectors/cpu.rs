// CPU collector

use super::field_or_default;
use crate::calculator::clamp_percent;
use crate::error::Result;
use crate::models::{CpuSnapshot, Domain, now_millis};
use crate::reader::HostReader;
use std::time::Duration;

/// Blocks for one sampling `window` inside the reader.
pub async fn collect(host: &dyn HostReader, window: Duration) -> Result<CpuSnapshot> {
    let sample = field_or_default(host.sample_cpu(window).await, Domain::Cpu, "usage");
    let per_core_usage: Vec<f64> = sample.per_core.iter().copied().map(clamp_percent).collect();
    let core_count = match host.cpu_count().await {
        Ok(n) => n,
        Err(e) => {
            tracing::debug!(error = %e, field = "core_count", "falling back to per-core sample length");
            per_core_usage.len() as u32
        }
    };
    let model = host
        .cpu_model()
        .await
        .ok()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| "Unknown".into());
    let load = field_or_default(host.load_average().await, Domain::Cpu, "load_average");

    Ok(CpuSnapshot {
        usage_percent: clamp_percent(sample.aggregate),
        per_core_usage,
        core_count,
        model,
        load_avg1: load.one,
        load_avg5: load.five,
        load_avg15: load.fifteen,
        timestamp: now_millis(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::CpuUsageSample;
    use crate::reader::fake::FakeHost;

    #[tokio::test]
    async fn clamps_sampled_values() {
        let host = FakeHost {
            cpu_sample: Some(CpuUsageSample {
                aggregate: 130.0,
                per_core: vec![-1.0, 50.0, 120.0],
            }),
            ..FakeHost::healthy()
        };
        let cpu = collect(&host, Duration::ZERO).await.unwrap();
        assert_eq!(cpu.usage_percent, 100.0);
        assert_eq!(cpu.per_core_usage, vec![0.0, 50.0, 100.0]);
    }

    #[tokio::test]
    async fn failed_fields_fall_back_to_zero_values() {
        let host = FakeHost {
            cpu_sample: None,
            cpu_count: None,
            cpu_model: None,
            load: None,
            ..FakeHost::healthy()
        };
        let cpu = collect(&host, Duration::ZERO).await.unwrap();
        assert_eq!(cpu.usage_percent, 0.0);
        assert!(cpu.per_core_usage.is_empty());
        assert_eq!(cpu.core_count, 0);
        assert_eq!(cpu.model, "Unknown");
        assert_eq!(cpu.load_avg1, 0.0);
        assert!(cpu.timestamp > 0);
    }

    #[tokio::test]
    async fn core_count_falls_back_to_sample_length() {
        let host = FakeHost {
            cpu_count: None,
            ..FakeHost::healthy()
        };
        let cpu = collect(&host, Duration::ZERO).await.unwrap();
        assert_eq!(cpu.core_count, 2);
    }
}
