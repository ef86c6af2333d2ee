use crate::aggregator::CollectSettings;
use crate::scheduler::{StreamLimits, StreamRequest};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub monitoring: MonitoringConfig,
    pub publishing: PublishingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8081,
            host: "0.0.0.0".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Blocking window for one CPU usage sample.
    pub cpu_sample_window_ms: u64,
    /// Per-collector deadline; must exceed the CPU window.
    pub collector_timeout_ms: u64,
    /// Stream cadence when the consumer does not ask for one.
    pub default_interval_secs: u64,
    pub min_interval_ms: u64,
    pub max_interval_secs: u64,
    pub default_top_n: usize,
    pub max_top_n: usize,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            cpu_sample_window_ms: 1000,
            collector_timeout_ms: 5000,
            default_interval_secs: 2,
            min_interval_ms: 500,
            max_interval_secs: 3600,
            default_top_n: 10,
            max_top_n: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PublishingConfig {
    /// A WebSocket send slower than this is treated as a disconnect.
    pub ws_send_timeout_ms: u64,
    pub ws_ping_interval_secs: u64,
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            ws_send_timeout_ms: 10_000,
            ws_ping_interval_secs: 30,
        }
    }
}

impl AppConfig {
    /// Load from `CONFIG_FILE` (default `config.toml`). A missing file means defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(s) => Self::load_from_str(&s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
            Err(e) => Err(anyhow::anyhow!("reading {}: {}", path, e)),
        }
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let m = &self.monitoring;
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(!self.server.host.is_empty(), "server.host must be non-empty");
        anyhow::ensure!(
            m.cpu_sample_window_ms > 0,
            "monitoring.cpu_sample_window_ms must be > 0, got {}",
            m.cpu_sample_window_ms
        );
        anyhow::ensure!(
            m.collector_timeout_ms > m.cpu_sample_window_ms,
            "monitoring.collector_timeout_ms must exceed cpu_sample_window_ms ({}), got {}",
            m.cpu_sample_window_ms,
            m.collector_timeout_ms
        );
        anyhow::ensure!(
            m.min_interval_ms > 0,
            "monitoring.min_interval_ms must be > 0, got {}",
            m.min_interval_ms
        );
        anyhow::ensure!(
            m.max_interval_secs.saturating_mul(1000) >= m.min_interval_ms,
            "monitoring.max_interval_secs must not be below min_interval_ms, got {}",
            m.max_interval_secs
        );
        anyhow::ensure!(
            m.default_interval_secs.saturating_mul(1000) >= m.min_interval_ms
                && m.default_interval_secs <= m.max_interval_secs,
            "monitoring.default_interval_secs must lie within the interval bounds, got {}",
            m.default_interval_secs
        );
        anyhow::ensure!(
            m.max_top_n > 0,
            "monitoring.max_top_n must be > 0, got {}",
            m.max_top_n
        );
        anyhow::ensure!(
            m.default_top_n > 0 && m.default_top_n <= m.max_top_n,
            "monitoring.default_top_n must be between 1 and max_top_n, got {}",
            m.default_top_n
        );
        anyhow::ensure!(
            self.publishing.ws_send_timeout_ms > 0,
            "publishing.ws_send_timeout_ms must be > 0, got {}",
            self.publishing.ws_send_timeout_ms
        );
        anyhow::ensure!(
            self.publishing.ws_ping_interval_secs > 0,
            "publishing.ws_ping_interval_secs must be > 0, got {}",
            self.publishing.ws_ping_interval_secs
        );
        Ok(())
    }

    pub fn collect_settings(&self) -> CollectSettings {
        CollectSettings {
            cpu_window: Duration::from_millis(self.monitoring.cpu_sample_window_ms),
            collector_timeout: Duration::from_millis(self.monitoring.collector_timeout_ms),
        }
    }

    pub fn stream_limits(&self) -> StreamLimits {
        StreamLimits {
            min_interval: Duration::from_millis(self.monitoring.min_interval_ms),
            max_interval: Duration::from_secs(self.monitoring.max_interval_secs),
            max_top_n: self.monitoring.max_top_n,
        }
    }

    /// Fill in whatever the consumer left out. Validation happens in the scheduler.
    pub fn stream_request(&self, interval_secs: Option<f64>, top_n: Option<usize>) -> StreamRequest {
        let interval = match interval_secs {
            Some(s) if s.is_finite() && s > 0.0 => {
                Duration::try_from_secs_f64(s).unwrap_or(Duration::MAX)
            }
            Some(_) => Duration::ZERO,
            None => Duration::from_secs(self.monitoring.default_interval_secs),
        };
        StreamRequest {
            interval,
            top_n: top_n.unwrap_or(self.monitoring.default_top_n),
        }
    }

    pub fn ws_send_timeout(&self) -> Duration {
        Duration::from_millis(self.publishing.ws_send_timeout_ms)
    }

    pub fn ws_ping_interval(&self) -> Duration {
        Duration::from_secs(self.publishing.ws_ping_interval_secs)
    }
}
