// Docker container models

use serde::{Deserialize, Serialize};

/// Docker container state; serializes to lowercase JSON (e.g. "running").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ContainerState {
    /// Parse from Docker API state string (e.g. "running", "exited").
    pub fn from_docker(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "created" => ContainerState::Created,
            "running" => ContainerState::Running,
            "paused" => ContainerState::Paused,
            "restarting" => ContainerState::Restarting,
            "removing" => ContainerState::Removing,
            "exited" => ContainerState::Exited,
            "dead" => ContainerState::Dead,
            _ => ContainerState::Unknown,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ContainerState::Running)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    pub private_port: u16,
    /// 0 when the port is not published.
    pub public_port: u16,
    #[serde(rename = "type")]
    pub type_: String,
    pub ip: String,
}

/// One container. Live metrics stay at zero unless the container is running
/// and its stats could be fetched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Short (12 character) id.
    pub id: String,
    pub name: String,
    pub image: String,
    /// Human status text from the runtime, e.g. "Up 3 hours".
    pub status: String,
    pub state: ContainerState,
    pub ports: Vec<PortMapping>,
    /// Unix seconds.
    pub created: i64,
    pub uptime: String,
    pub cpu_percent: f64,
    pub memory_usage_mb: f64,
    pub memory_limit_mb: f64,
    pub memory_percent: f64,
    pub net_input_mb: f64,
    pub net_output_mb: f64,
    pub block_input_mb: f64,
    pub block_output_mb: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSnapshot {
    /// False only when the runtime itself could not be reached.
    pub available: bool,
    pub containers: Vec<Container>,
    pub running_count: usize,
    pub total_count: usize,
    pub timestamp: u64,
}

impl ContainerSnapshot {
    pub fn unavailable(timestamp: u64) -> Self {
        Self {
            available: false,
            timestamp,
            ..Default::default()
        }
    }
}
