// Error taxonomy for collection and delivery

use crate::models::Domain;

/// Errors that can escape a collector, the aggregator or a delivery loop.
///
/// Field-level read failures never become an error value: the affected field
/// falls back to its zero value inside the collector.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("{domain} source unavailable: {reason}")]
    SourceUnavailable { domain: Domain, reason: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("invalid request: {0}")]
    Configuration(String),
}

impl MonitorError {
    pub fn unavailable(domain: Domain, reason: impl std::fmt::Display) -> Self {
        MonitorError::SourceUnavailable {
            domain,
            reason: reason.to_string(),
        }
    }

    pub fn transport(reason: impl std::fmt::Display) -> Self {
        MonitorError::Transport(reason.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
