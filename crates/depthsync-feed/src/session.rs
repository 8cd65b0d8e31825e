//! Session driver.
//!
//! One session runs per subscription as a spawned task. It owns the
//! connect/stream/backoff loop and publishes every state change through a
//! generation-checked [`Publisher`], so a session that has been superseded
//! (symbol switch or unsubscribe) can never write into the consumer's view.

use crate::config::FeedConfig;
use crate::engine::{EngineOutcome, FeedEngine};
use crate::state::{ConnectionState, ConnectionStatus, FeedState};
use chrono::Utc;
use depthsync_core::BookSide;
use depthsync_telemetry::Metrics;
use depthsync_ws::{
    stream_names, AckOutcome, Connector, ControlFrame, FeedTransport, HeartbeatMonitor,
    StreamKind, SubscriptionTracker, TransportEvent, WsError, WsResult,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Upper bound on the graceful close handshake.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Writes into the shared state only while its generation is current.
#[derive(Debug, Clone)]
pub(crate) struct Publisher {
    tx: Arc<watch::Sender<FeedState>>,
    generation: u64,
}

impl Publisher {
    pub(crate) fn new(tx: Arc<watch::Sender<FeedState>>, generation: u64) -> Self {
        Self { tx, generation }
    }

    /// Apply `update` and notify receivers. Returns `false` (and changes
    /// nothing) if the session has been superseded.
    pub(crate) fn publish(&self, update: impl FnOnce(&mut FeedState)) -> bool {
        let generation = self.generation;
        self.tx.send_if_modified(|state| {
            if state.generation != generation {
                return false;
            }
            update(state);
            true
        })
    }
}

/// Why a connection ended.
#[derive(Debug)]
enum SessionEnd {
    /// Unsubscribed or superseded.
    Cancelled,
    /// Retryable transport failure.
    Transport(WsError),
    /// Server-side rejection; no retry.
    Protocol(String),
}

enum Step {
    Cancelled,
    Event(WsResult<TransportEvent>),
    Heartbeat,
}

pub(crate) struct Session {
    config: FeedConfig,
    connector: Arc<dyn Connector>,
    publisher: Publisher,
    cancel: CancellationToken,
    engine: FeedEngine,
    tracker: SubscriptionTracker,
    /// Consecutive failed attempts since the last successful sync.
    failures: u32,
    /// First snapshot received on the current connection.
    synced: bool,
}

impl Session {
    pub(crate) fn new(
        config: FeedConfig,
        symbol: String,
        connector: Arc<dyn Connector>,
        publisher: Publisher,
        cancel: CancellationToken,
    ) -> Self {
        let engine = FeedEngine::new(symbol, config.book_depth, config.trade_history);
        Self {
            config,
            connector,
            publisher,
            cancel,
            engine,
            tracker: SubscriptionTracker::new(),
            failures: 0,
            synced: false,
        }
    }

    /// Connect, stream and reconnect until cancelled, exhausted or rejected.
    pub(crate) async fn run(mut self) {
        let policy = self.config.backoff_policy();
        info!(symbol = %self.engine.symbol(), url = %self.config.url, "Feed session started");

        loop {
            let end = self.connect_and_stream().await;
            self.synced = false;
            self.engine.mark_unsynced();

            let err = match end {
                SessionEnd::Cancelled => {
                    info!(symbol = %self.engine.symbol(), "Feed session cancelled");
                    return;
                }
                SessionEnd::Protocol(message) => {
                    error!(symbol = %self.engine.symbol(), %message, "Feed session stopped on protocol error");
                    self.transition(ConnectionState::Error, None, Some(message));
                    return;
                }
                SessionEnd::Transport(err) => err,
            };

            self.failures += 1;
            if policy.is_exhausted(self.failures) {
                let retries = self.failures - 1;
                error!(
                    symbol = %self.engine.symbol(),
                    retries,
                    error = %err,
                    "Max reconnection attempts reached"
                );
                self.transition(
                    ConnectionState::Disconnected,
                    Some(retries),
                    Some(format!("{err} (gave up after {retries} reconnect attempts)")),
                );
                return;
            }

            let attempt = self.failures;
            let delay = policy.delay(attempt);
            warn!(
                symbol = %self.engine.symbol(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Reconnecting"
            );
            Metrics::reconnect(err.reason());
            if !self.transition(
                ConnectionState::Reconnecting,
                Some(attempt),
                Some(err.to_string()),
            ) {
                return;
            }

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    info!(symbol = %self.engine.symbol(), "Cancelled during backoff");
                    return;
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Publish a connection state change. `attempt: None` keeps the current counter.
    fn transition(
        &self,
        state: ConnectionState,
        attempt: Option<u32>,
        last_error: Option<String>,
    ) -> bool {
        let stale = self.engine.is_stale();
        let published = self.publisher.publish(|s| {
            s.connection = ConnectionStatus {
                state,
                attempt: attempt.unwrap_or(s.connection.attempt),
                last_error,
            };
            s.stale = stale;
        });
        if published {
            Metrics::feed_state_set(state.as_str());
        }
        published
    }

    async fn connect_and_stream(&mut self) -> SessionEnd {
        let timeout_ms = self.config.connect_timeout_ms;
        let connect =
            tokio::time::timeout(self.config.connect_timeout(), self.connector.connect(&self.config.url));

        let mut transport = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return SessionEnd::Cancelled,
            result = connect => match result {
                Ok(Ok(transport)) => transport,
                Ok(Err(e)) => {
                    warn!(url = %self.config.url, error = %e, "Connection attempt failed");
                    return SessionEnd::Transport(e);
                }
                Err(_) => {
                    warn!(url = %self.config.url, timeout_ms, "Connection attempt timed out");
                    return SessionEnd::Transport(WsError::ConnectTimeout(timeout_ms));
                }
            },
        };
        Metrics::connected();

        let end = self.stream(transport.as_mut()).await;
        if !matches!(end, SessionEnd::Transport(_)) {
            let _ = tokio::time::timeout(CLOSE_TIMEOUT, transport.close()).await;
        }
        end
    }

    async fn stream(&mut self, transport: &mut dyn FeedTransport) -> SessionEnd {
        self.tracker.reset();
        let frame = self.tracker.subscribe(stream_names(self.engine.symbol()));
        if let Err(e) = send_control(transport, &frame).await {
            return SessionEnd::Transport(e);
        }

        let mut heartbeat = HeartbeatMonitor::new(self.config.heartbeat_interval());

        loop {
            let step = tokio::select! {
                biased;
                () = self.cancel.cancelled() => Step::Cancelled,
                event = transport.next_event() => Step::Event(event),
                () = heartbeat.wait_for_check() => Step::Heartbeat,
            };

            match step {
                Step::Cancelled => return SessionEnd::Cancelled,
                Step::Heartbeat => {
                    if heartbeat.is_timed_out() {
                        warn!(idle_ms = heartbeat.idle_for().as_millis() as u64, "Heartbeat timeout");
                        return SessionEnd::Transport(WsError::HeartbeatTimeout);
                    }
                    if heartbeat.should_send_ping() {
                        debug!("Link idle, sending ping");
                        if let Err(e) = transport.send_ping().await {
                            return SessionEnd::Transport(e);
                        }
                        heartbeat.record_ping();
                    }
                }
                Step::Event(Ok(TransportEvent::Pong)) => heartbeat.record_pong(),
                Step::Event(Ok(TransportEvent::Closed { code, reason })) => {
                    return SessionEnd::Transport(WsError::ConnectionClosed { code, reason });
                }
                Step::Event(Err(e)) => {
                    error!(error = %e, "WebSocket read error");
                    return SessionEnd::Transport(e);
                }
                Step::Event(Ok(TransportEvent::Text(text))) => {
                    heartbeat.record_message();
                    if let Some(end) = self.handle_text(transport, &text).await {
                        return end;
                    }
                }
            }
        }
    }

    /// Apply one text frame. `Some` ends the connection.
    async fn handle_text(
        &mut self,
        transport: &mut dyn FeedTransport,
        text: &str,
    ) -> Option<SessionEnd> {
        let now = Utc::now();

        match self.engine.handle_text(text) {
            EngineOutcome::Snapshot => {
                Metrics::message_applied("snapshot");
                self.record_depth();
                let first = !self.synced;
                self.synced = true;
                if first {
                    self.failures = 0;
                    info!(symbol = %self.engine.symbol(), "Feed connected");
                }
                let book = self.engine.book_snapshot();
                let published = self.publisher.publish(|s| {
                    s.order_book = book;
                    s.stale = false;
                    s.last_message_at = Some(now);
                    if first {
                        s.connection = ConnectionStatus {
                            state: ConnectionState::Connected,
                            attempt: 0,
                            last_error: None,
                        };
                    }
                });
                if published && first {
                    Metrics::feed_state_set(ConnectionState::Connected.as_str());
                }
                superseded(published)
            }
            EngineOutcome::Update => {
                Metrics::message_applied("update");
                self.record_depth();
                let book = self.engine.book_snapshot();
                superseded(self.publisher.publish(|s| {
                    s.order_book = book;
                    s.last_message_at = Some(now);
                }))
            }
            EngineOutcome::Trade => {
                Metrics::message_applied("trade");
                let trades = self.engine.trades();
                superseded(self.publisher.publish(|s| {
                    s.recent_trades = trades;
                    s.last_message_at = Some(now);
                }))
            }
            EngineOutcome::Dropped(reason) => {
                Metrics::message_dropped(reason.as_str());
                None
            }
            EngineOutcome::ResyncRequired { expected, received } => {
                Metrics::resync();
                info!(expected, received, "Requesting fresh depth snapshot");
                let depth = vec![StreamKind::Depth.stream_name(self.engine.symbol())];
                let unsubscribe = self.tracker.unsubscribe(depth.clone());
                let subscribe = self.tracker.subscribe(depth);
                for frame in [unsubscribe, subscribe] {
                    if let Err(e) = send_control(transport, &frame).await {
                        return Some(SessionEnd::Transport(e));
                    }
                }
                superseded(self.publisher.publish(|s| s.stale = true))
            }
            EngineOutcome::ProtocolError(message) => Some(SessionEnd::Protocol(message)),
            EngineOutcome::Control(response) => match self.tracker.handle_response(&response) {
                AckOutcome::Rejected { reason, .. } => Some(SessionEnd::Protocol(format!(
                    "subscription rejected: {reason}"
                ))),
                AckOutcome::Acknowledged { .. } | AckOutcome::Unmatched(_) => None,
            },
        }
    }

    fn record_depth(&self) {
        Metrics::book_depth(
            self.engine.depth(BookSide::Bid),
            self.engine.depth(BookSide::Ask),
        );
    }
}

fn superseded(published: bool) -> Option<SessionEnd> {
    (!published).then_some(SessionEnd::Cancelled)
}

async fn send_control(transport: &mut dyn FeedTransport, frame: &ControlFrame) -> WsResult<()> {
    debug!(method = %frame.method, id = frame.id, params = ?frame.params, "Sending control frame");
    transport.send_text(frame.to_json()?).await
}
