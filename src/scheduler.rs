// Per-consumer live delivery loop.
// One scheduler (and one collection context) per consumer; nothing is shared
// between consumers. Cycles are strictly sequential and the first one runs
// immediately.

use crate::aggregator::Aggregator;
use crate::collectors::CollectionContext;
use crate::error::{MonitorError, Result};
use crate::models::Snapshot;
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::Instrument;

/// Where a consumer's snapshots go. An error ends that consumer's loop.
#[async_trait]
pub trait SnapshotSink: Send {
    async fn deliver(&mut self, snapshot: &Snapshot) -> Result<()>;
}

/// Bounds for stream requests, taken from config.
#[derive(Debug, Clone, Copy)]
pub struct StreamLimits {
    pub min_interval: Duration,
    pub max_interval: Duration,
    pub max_top_n: usize,
}

impl Default for StreamLimits {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(3600),
            max_top_n: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub interval: Duration,
    pub top_n: usize,
}

impl StreamRequest {
    pub fn validate(&self, limits: &StreamLimits) -> Result<()> {
        if self.interval < limits.min_interval || self.interval > limits.max_interval {
            return Err(MonitorError::Configuration(format!(
                "interval must be between {:?} and {:?}, got {:?}",
                limits.min_interval, limits.max_interval, self.interval
            )));
        }
        if self.top_n == 0 || self.top_n > limits.max_top_n {
            return Err(MonitorError::Configuration(format!(
                "top must be between 1 and {}, got {}",
                limits.max_top_n, self.top_n
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running(Duration),
    /// Terminal.
    Stopped,
}

pub struct Scheduler {
    aggregator: Aggregator,
    request: StreamRequest,
    ctx: CollectionContext,
    state: SchedulerState,
    last_timestamp: u64,
}

impl Scheduler {
    /// Validates the request before any collection work happens.
    pub fn new(aggregator: Aggregator, request: StreamRequest, limits: &StreamLimits) -> Result<Self> {
        request.validate(limits)?;
        Ok(Self {
            aggregator,
            request,
            ctx: CollectionContext::new(),
            state: SchedulerState::Idle,
            last_timestamp: 0,
        })
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Deliver snapshots until `stop` fires (or its sender is dropped) or the
    /// sink fails. Returns the number of deliveries on cancellation; a sink
    /// failure is returned as the error.
    pub async fn run<S: SnapshotSink + ?Sized>(
        &mut self,
        sink: &mut S,
        mut stop: oneshot::Receiver<()>,
    ) -> Result<u64> {
        if self.state == SchedulerState::Stopped {
            return Err(MonitorError::Configuration(
                "scheduler already stopped".into(),
            ));
        }
        let period = self.request.interval;
        self.state = SchedulerState::Running(period);

        let scheduler_span = tracing::debug_span!(
            "scheduler",
            interval_ms = period.as_millis() as u64,
            top_n = self.request.top_n
        );
        let outcome = self.cycles(sink, &mut stop).instrument(scheduler_span).await;
        self.state = SchedulerState::Stopped;
        outcome
    }

    async fn cycles<S: SnapshotSink + ?Sized>(
        &mut self,
        sink: &mut S,
        stop: &mut oneshot::Receiver<()>,
    ) -> Result<u64> {
        let mut tick = interval(self.request.interval);
        // An overrunning cycle is followed straight away by the next one, never by a burst.
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut delivered: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = &mut *stop => break,
                _ = tick.tick() => {}
            }

            let snapshot = tokio::select! {
                biased;
                _ = &mut *stop => break,
                s = self.aggregator.collect_all(&self.ctx, self.request.top_n) => s,
            };
            let snapshot = self.stamp(snapshot);

            let sent = tokio::select! {
                biased;
                _ = &mut *stop => break,
                r = sink.deliver(&snapshot) => r,
            };
            if let Err(e) = sent {
                tracing::info!(error = %e, delivered, "delivery failed; stopping consumer loop");
                return Err(e);
            }
            delivered += 1;
        }

        tracing::debug!(delivered, "scheduler cancelled");
        Ok(delivered)
    }

    /// Keep every timestamp (composite and per-domain) non-decreasing for
    /// this consumer: nothing in a cycle is stamped earlier than anything in
    /// the cycle before it.
    fn stamp(&mut self, mut snapshot: Snapshot) -> Snapshot {
        let floor = self.last_timestamp;
        let mut latest = floor;
        for ts in snapshot.timestamps_mut() {
            *ts = (*ts).max(floor);
            latest = latest.max(*ts);
        }
        self.last_timestamp = latest;
        snapshot
    }
}

/// Run `scheduler` on its own task. Send on (or drop) the returned sender to stop it.
pub fn spawn<S>(
    mut scheduler: Scheduler,
    mut sink: S,
) -> (oneshot::Sender<()>, tokio::task::JoinHandle<Result<u64>>)
where
    S: SnapshotSink + 'static,
{
    let (stop_tx, stop_rx) = oneshot::channel();
    let handle = tokio::spawn(async move { scheduler.run(&mut sink, stop_rx).await });
    (stop_tx, handle)
}

/// Delivers into an in-process channel; a dropped receiver is a disconnect.
pub struct ChannelSink(pub mpsc::Sender<Snapshot>);

#[async_trait]
impl SnapshotSink for ChannelSink {
    async fn deliver(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.0
            .send(snapshot.clone())
            .await
            .map_err(|_| MonitorError::transport("consumer channel closed"))
    }
}

/// Writes one JSON document per line (watch mode).
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> SnapshotSink for JsonLinesSink<W> {
    async fn deliver(&mut self, snapshot: &Snapshot) -> Result<()> {
        let mut line = serde_json::to_vec(snapshot).map_err(MonitorError::transport)?;
        line.push(b'\n');
        self.writer
            .write_all(&line)
            .await
            .map_err(MonitorError::transport)?;
        self.writer.flush().await.map_err(MonitorError::transport)
    }
}
