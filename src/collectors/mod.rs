// Snapshot collectors, one per domain.
//
// A collector composes reader output and calculator results into one typed
// snapshot. A failed field read degrades that field to its zero value. Only
// a failure to enumerate the domain's entities (partitions, processes,
// sockets, interfaces, containers) makes the whole domain unavailable.

pub mod container;
pub mod cpu;
pub mod disk;
pub mod memory;
pub mod network;
pub mod port;
pub mod process;
pub mod system;

use crate::calculator::DeltaState;
use crate::models::Domain;
use tokio::sync::{Mutex, MutexGuard};

/// Per-consumer collection state that outlives a single cycle.
///
/// Each consumer owns one; the lock only matters when one-shot requests
/// share a context.
#[derive(Debug, Default)]
pub struct CollectionContext {
    deltas: Mutex<DeltaState>,
}

impl CollectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn deltas(&self) -> MutexGuard<'_, DeltaState> {
        self.deltas.lock().await
    }
}

/// Unwrap a field read, falling back to the zero value on failure.
pub(crate) fn field_or_default<T: Default>(
    result: anyhow::Result<T>,
    domain: Domain,
    field: &'static str,
) -> T {
    match result {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, %domain, field, "field read failed; using zero value");
            T::default()
        }
    }
}
