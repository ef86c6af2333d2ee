// WebSocket stream: one scheduler per connection

use async_trait::async_trait;
use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{Mutex, oneshot};
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at, timeout};

use super::AppState;
use crate::error::{MonitorError, Result};
use crate::models::Snapshot;
use crate::scheduler::{Scheduler, SnapshotSink};

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

#[derive(Debug, Deserialize)]
pub(super) struct StreamQuery {
    /// Seconds between deliveries; fractions allowed.
    interval: Option<f64>,
    top: Option<usize>,
}

/// Sends each snapshot as one JSON text frame.
struct WebSocketSink {
    sender: WsSender,
    send_timeout: Duration,
}

#[async_trait]
impl SnapshotSink for WebSocketSink {
    async fn deliver(&mut self, snapshot: &Snapshot) -> Result<()> {
        let json = serde_json::to_string(snapshot).map_err(MonitorError::transport)?;
        send_frame(&self.sender, Message::Text(json.into()), self.send_timeout).await
    }
}

async fn send_frame(sender: &WsSender, frame: Message, send_timeout: Duration) -> Result<()> {
    let mut sender = sender.lock().await;
    match timeout(send_timeout, sender.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(MonitorError::transport(e)),
        Err(_) => Err(MonitorError::transport(format!(
            "send timed out after {:?}",
            send_timeout
        ))),
    }
}

/// GET /ws?interval=S&top=N. The request is validated before the upgrade.
pub(super) async fn ws_stream(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(q): Query<StreamQuery>,
) -> Response {
    let request = state.config.stream_request(q.interval, q.top);
    let scheduler = match Scheduler::new(
        state.aggregator.clone(),
        request,
        &state.config.stream_limits(),
    ) {
        Ok(s) => s,
        Err(e) => return e.into_response(),
    };
    let send_timeout = state.config.ws_send_timeout();
    let ping_every = state.config.ws_ping_interval();
    ws.on_upgrade(move |socket| stream_snapshots(socket, scheduler, send_timeout, ping_every))
        .into_response()
}

async fn stream_snapshots(
    socket: WebSocket,
    mut scheduler: Scheduler,
    send_timeout: Duration,
    ping_every: Duration,
) {
    tracing::info!("Client connected to snapshot stream");
    let (sender, receiver) = socket.split();
    let sender: WsSender = Arc::new(Mutex::new(sender));
    let (stop_tx, stop_rx) = oneshot::channel();

    let watcher = tokio::spawn(watch_connection(
        receiver,
        sender.clone(),
        send_timeout,
        ping_every,
        stop_tx,
    ));

    let mut sink = WebSocketSink {
        sender,
        send_timeout,
    };
    match scheduler.run(&mut sink, stop_rx).await {
        Ok(delivered) => tracing::info!(delivered, "Client left snapshot stream"),
        Err(e) => tracing::info!(error = %e, "Snapshot stream ended"),
    }
    watcher.abort();
}

/// Reads until the client goes away, pinging on the side; then stops the scheduler.
async fn watch_connection(
    mut receiver: SplitStream<WebSocket>,
    sender: WsSender,
    send_timeout: Duration,
    ping_every: Duration,
    stop_tx: oneshot::Sender<()>,
) {
    let mut ping = interval_at(Instant::now() + ping_every, ping_every);
    ping.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            msg = receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            _ = ping.tick() => {
                if send_frame(&sender, Message::Ping(Bytes::new()), send_timeout).await.is_err() {
                    break;
                }
            }
        }
    }
    let _ = stop_tx.send(());
}
