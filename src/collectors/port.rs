// Listening port collector

use crate::error::{MonitorError, Result};
use crate::models::{Domain, ListeningSocket, PortSnapshot, now_millis};
use crate::reader::{HostReader, Protocol, RawSocket, SocketState};
use std::collections::{HashMap, HashSet};

pub async fn collect(host: &dyn HostReader) -> Result<PortSnapshot> {
    let sockets = host
        .sockets()
        .await
        .map_err(|e| MonitorError::unavailable(Domain::Port, e))?;

    let mut names: HashMap<u32, String> = HashMap::new();
    let mut listening = Vec::new();
    for s in listening_unique(sockets) {
        let process_name = if s.pid > 0 {
            match names.get(&s.pid) {
                Some(n) => n.clone(),
                None => {
                    let n = host.process_name(s.pid).await.unwrap_or_default();
                    names.insert(s.pid, n.clone());
                    n
                }
            }
        } else {
            String::new()
        };
        listening.push(ListeningSocket {
            port: s.local_port,
            protocol: s.protocol.as_str().to_string(),
            address: s.local_addr,
            pid: s.pid,
            process_name,
            state: s.state.as_str().to_string(),
        });
    }
    listening.sort_by(|a, b| a.port.cmp(&b.port).then_with(|| a.protocol.cmp(&b.protocol)));

    Ok(PortSnapshot {
        listening,
        timestamp: now_millis(),
    })
}

/// Only sockets in LISTEN count. UDP has no such state, so bound UDP
/// sockets (servers and connected clients alike) are never reported.
pub fn is_listening(s: &RawSocket) -> bool {
    s.state == SocketState::Listen
}

/// Listening sockets, one per (protocol, port); the first occurrence wins.
pub fn listening_unique(sockets: Vec<RawSocket>) -> Vec<RawSocket> {
    let mut seen: HashSet<(Protocol, u16)> = HashSet::new();
    sockets
        .into_iter()
        .filter(is_listening)
        .filter(|s| seen.insert((s.protocol, s.local_port)))
        .collect()
}
