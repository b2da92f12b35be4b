//! Receive-only client for the bot's log WebSocket
//!
//! Decoded events land in a bounded [`LogBuffer`] that survives reconnects.
//! Connection changes are announced in the buffer itself as SYSTEM events.
//! Lost connections are retried with bounded exponential backoff; once the
//! budget is spent the client parks in [`ConnectionState::Failed`] until an
//! operator asks for a manual reconnect.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::{broadcast, watch, Notify};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, info, warn};

use crate::api::shared::{connect_ws, reconnect_with_backoff, ReconnectConfig, WsStream};
use crate::api::ClientError;

use super::log_buffer::{decode_log_event, shared_log_buffer, LogEvent, SharedLogBuffer};

/// Live-event fan-out capacity for subscribers
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    /// Waiting for or running reconnect attempt `attempt` (1-based)
    Reconnecting { attempt: u32 },
    /// Backoff budget exhausted; only a manual reconnect resumes
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "CONNECTING"),
            ConnectionState::Open => write!(f, "OPEN"),
            ConnectionState::Reconnecting { attempt } => write!(f, "RECONNECTING ({})", attempt),
            ConnectionState::Failed => write!(f, "FAILED"),
        }
    }
}

enum PumpExit {
    Shutdown,
    Lost(String),
}

struct StreamShared {
    url: String,
    reconnect: ReconnectConfig,
    buffer: SharedLogBuffer,
    state_tx: watch::Sender<ConnectionState>,
    events_tx: broadcast::Sender<LogEvent>,
    reconnect_requested: Notify,
    malformed: AtomicU64,
}

/// Handle on the log stream; clone freely, spawn once
#[derive(Clone)]
pub struct LogStreamClient {
    shared: Arc<StreamShared>,
}

impl LogStreamClient {
    pub fn new(url: impl Into<String>, reconnect: ReconnectConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Connecting);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(StreamShared {
                url: url.into(),
                reconnect,
                buffer: shared_log_buffer(),
                state_tx,
                events_tx,
                reconnect_requested: Notify::new(),
                malformed: AtomicU64::new(0),
            }),
        }
    }

    pub fn url(&self) -> &str {
        &self.shared.url
    }

    pub fn buffer(&self) -> SharedLogBuffer {
        Arc::clone(&self.shared.buffer)
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Live copy of every event appended from now on
    pub fn subscribe(&self) -> broadcast::Receiver<LogEvent> {
        self.shared.events_tx.subscribe()
    }

    /// Payloads dropped because they did not decode
    pub fn malformed_count(&self) -> u64 {
        self.shared.malformed.load(Ordering::Relaxed)
    }

    /// Leave FAILED and start over. Returns false in any other state.
    pub fn request_reconnect(&self) -> bool {
        if self.state() != ConnectionState::Failed {
            return false;
        }
        self.shared.reconnect_requested.notify_one();
        true
    }

    /// Spawn the connection task. Dropping the handle aborts it; sending on
    /// the shutdown channel closes the socket gracefully first.
    pub fn spawn(&self, shutdown_rx: broadcast::Receiver<()>) -> AbortOnDropHandle<()> {
        let client = self.clone();
        AbortOnDropHandle::new(tokio::spawn(async move { client.run(shutdown_rx).await }))
    }

    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut immediate = true;
        loop {
            let connected = tokio::select! {
                _ = shutdown_rx.recv() => break,
                ws = self.establish(immediate) => ws,
            };

            match connected {
                Some(ws) => {
                    self.set_state(ConnectionState::Open);
                    info!(event_type = "LOG_STREAM", url = %self.shared.url, "Log stream connected");
                    self.append(LogEvent::system(format!(
                        "Connected to log stream ({})",
                        self.shared.url
                    )))
                    .await;

                    match self.pump(ws, &mut shutdown_rx).await {
                        PumpExit::Shutdown => break,
                        PumpExit::Lost(reason) => {
                            warn!(event_type = "LOG_STREAM", reason = %reason, "Log stream lost");
                            self.append(LogEvent::system(format!(
                                "Disconnected from log stream: {}",
                                reason
                            )))
                            .await;
                            immediate = false;
                        }
                    }
                }
                None => {
                    self.set_state(ConnectionState::Failed);
                    warn!(
                        event_type = "LOG_STREAM",
                        attempts = self.shared.reconnect.max_attempts,
                        "Log stream reconnect budget exhausted"
                    );
                    self.append(LogEvent::system(format!(
                        "Log stream unavailable after {} reconnect attempts; manual reconnect required",
                        self.shared.reconnect.max_attempts
                    )))
                    .await;

                    tokio::select! {
                        _ = shutdown_rx.recv() => break,
                        _ = self.shared.reconnect_requested.notified() => {
                            self.append(LogEvent::system("Reconnecting to log stream")).await;
                            immediate = true;
                        }
                    }
                }
            }
        }
        debug!(event_type = "LOG_STREAM", "Log stream task stopped");
    }

    /// One immediate attempt (when `immediate`), then the backoff loop.
    /// `None` once every attempt failed.
    async fn establish(&self, immediate: bool) -> Option<WsStream> {
        if immediate {
            self.set_state(ConnectionState::Connecting);
            match connect_ws(&self.shared.url).await {
                Ok(ws) => return Some(ws),
                Err(e) => self.connect_failed(&e).await,
            }
        }

        self.set_state(ConnectionState::Reconnecting { attempt: 1 });
        let this = self;
        reconnect_with_backoff(&self.shared.reconnect, "log-stream", |attempt| async move {
            this.set_state(ConnectionState::Reconnecting {
                attempt: attempt + 1,
            });
            let result = connect_ws(&this.shared.url).await;
            if let Err(e) = &result {
                this.connect_failed(e).await;
            }
            result
        })
        .await
        .ok()
    }

    async fn pump(&self, mut ws: WsStream, shutdown_rx: &mut broadcast::Receiver<()>) -> PumpExit {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    if let Err(e) = ws.close(None).await {
                        debug!(event_type = "LOG_STREAM", error = %e, "Close handshake failed");
                    }
                    return PumpExit::Shutdown;
                }
                msg = ws.next() => match msg {
                    Some(Ok(Message::Text(text))) => self.ingest(&text).await,
                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => self.ingest(text).await,
                        Err(_) => self.drop_malformed("binary frame is not UTF-8"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "closed by server".to_string());
                        return PumpExit::Lost(reason);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return PumpExit::Lost(e.to_string()),
                    None => return PumpExit::Lost("stream ended".to_string()),
                }
            }
        }
    }

    async fn ingest(&self, payload: &str) {
        match decode_log_event(payload) {
            Ok(event) => self.append(event).await,
            Err(e) => self.drop_malformed(&e.to_string()),
        }
    }

    fn drop_malformed(&self, reason: &str) {
        self.shared.malformed.fetch_add(1, Ordering::Relaxed);
        debug!(event_type = "LOG_STREAM", reason = reason, "Dropped malformed payload");
    }

    async fn connect_failed(&self, error: &ClientError) {
        debug!(event_type = "LOG_STREAM", error = %error, "Log stream connection failed");
        self.append(LogEvent::error(format!("Connection failed: {}", error)))
            .await;
    }

    async fn append(&self, event: LogEvent) {
        self.shared.buffer.write().await.push(event.clone());
        // No subscribers is fine
        let _ = self.shared.events_tx.send(event);
    }

    fn set_state(&self, state: ConnectionState) {
        self.shared.state_tx.send_replace(state);
    }
}
