// Host identity collector

use super::field_or_default;
use crate::error::Result;
use crate::models::{Domain, SystemSnapshot, now_millis};
use crate::reader::HostReader;

pub async fn collect(host: &dyn HostReader) -> Result<SystemSnapshot> {
    let info = field_or_default(host.host_info().await, Domain::System, "host_info");
    Ok(SystemSnapshot {
        hostname: info.hostname,
        os: info.os,
        kernel: info.kernel,
        uptime_secs: info.uptime_secs,
        timestamp: now_millis(),
    })
}
