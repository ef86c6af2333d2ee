// Network interface collector

use crate::error::{MonitorError, Result};
use crate::models::{Domain, Interface, NetworkSnapshot, now_millis};
use crate::reader::{HostReader, IoCounters, RawInterface};
use std::collections::HashMap;
use std::net::IpAddr;

pub async fn collect(host: &dyn HostReader) -> Result<NetworkSnapshot> {
    let interfaces = host.interfaces().await;
    let counters = host.io_counters().await;

    let (interfaces, counters) = match (interfaces, counters) {
        (Ok(i), Ok(c)) => (i, c),
        (Ok(i), Err(e)) => {
            tracing::debug!(error = %e, field = "io_counters", "interface counters unavailable");
            (i, Vec::new())
        }
        (Err(e), Ok(c)) => {
            tracing::debug!(error = %e, field = "interfaces", "listing interfaces from counters");
            let names = c
                .iter()
                .map(|c| RawInterface {
                    name: c.name.clone(),
                    addrs: Vec::new(),
                })
                .collect();
            (names, c)
        }
        (Err(e), Err(_)) => return Err(MonitorError::unavailable(Domain::Network, e)),
    };

    Ok(NetworkSnapshot {
        interfaces: merge(interfaces, counters),
        timestamp: now_millis(),
    })
}

/// Join interfaces with their counters by name, skipping loopback.
/// Interfaces without counters carry zeros.
pub fn merge(interfaces: Vec<RawInterface>, counters: Vec<IoCounters>) -> Vec<Interface> {
    let mut by_name: HashMap<String, IoCounters> = HashMap::with_capacity(counters.len());
    for c in counters {
        by_name.entry(c.name.clone()).or_insert(c);
    }

    interfaces
        .into_iter()
        .filter(|i| !is_loopback(i))
        .map(|i| {
            let c = by_name.get(&i.name).cloned().unwrap_or_default();
            Interface {
                name: i.name,
                addrs: i.addrs,
                bytes_sent: c.bytes_sent,
                bytes_recv: c.bytes_recv,
                packets_sent: c.packets_sent,
                packets_recv: c.packets_recv,
            }
        })
        .collect()
}

fn is_loopback(iface: &RawInterface) -> bool {
    if iface.name == "lo" {
        return true;
    }
    !iface.addrs.is_empty()
        && iface.addrs.iter().all(|a| {
            let ip = a.split('/').next().unwrap_or(a);
            ip.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
        })
}
