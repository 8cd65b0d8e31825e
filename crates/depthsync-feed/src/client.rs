//! Market feed client.
//!
//! `MarketFeedClient` owns at most one subscription at a time. Each
//! subscription runs as its own session task; the consumer reads state
//! through [`FeedHandle`]s, which observe a shared `watch` channel.

use crate::config::FeedConfig;
use crate::error::{FeedError, FeedResult};
use crate::handle::FeedHandle;
use crate::session::{Publisher, Session};
use crate::state::{ConnectionState, ConnectionStatus, FeedState};
use depthsync_core::{OrderBookSnapshot, Trade};
use depthsync_telemetry::Metrics;
use depthsync_ws::{init_crypto, normalize_symbol, Connector, TungsteniteConnector};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

struct ActiveSession {
    symbol: String,
    cancel: CancellationToken,
}

/// Live order book and trade feed for one symbol at a time.
pub struct MarketFeedClient {
    config: FeedConfig,
    connector: Arc<dyn Connector>,
    state_tx: Arc<watch::Sender<FeedState>>,
    active: Mutex<Option<ActiveSession>>,
}

impl MarketFeedClient {
    /// Client using real WebSocket connections.
    pub fn new(config: FeedConfig) -> FeedResult<Self> {
        init_crypto();
        Self::with_connector(config, Arc::new(TungsteniteConnector::new()))
    }

    /// Client using a custom connector.
    pub fn with_connector(config: FeedConfig, connector: Arc<dyn Connector>) -> FeedResult<Self> {
        config.validate()?;
        let (state_tx, _) = watch::channel(FeedState::default());
        Ok(Self {
            config,
            connector,
            state_tx: Arc::new(state_tx),
            active: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Start streaming `symbol`.
    ///
    /// Re-subscribing to the symbol that is already live is a no-op. Any other
    /// call tears down the current session, clears book and trades, and starts
    /// a fresh session in `Connecting` with the attempt counter reset.
    pub fn subscribe(&self, symbol: &str) -> FeedResult<FeedHandle> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(FeedError::InvalidSymbol(symbol));
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| FeedError::NoRuntime)?;

        let mut active = self.active.lock();
        if let Some(session) = active.as_ref() {
            if session.symbol == symbol && self.state_tx.borrow().connection.state.is_live() {
                debug!(%symbol, "Already subscribed");
                return Ok(self.handle());
            }
        }
        if let Some(previous) = active.take() {
            info!(from = %previous.symbol, to = %symbol, "Replacing subscription");
            previous.cancel.cancel();
        }

        let mut generation = 0;
        self.state_tx.send_modify(|state| {
            generation = state.generation + 1;
            *state = FeedState::subscribing(symbol.clone(), generation);
        });
        Metrics::feed_state_set(ConnectionState::Connecting.as_str());

        let cancel = CancellationToken::new();
        let session = Session::new(
            self.config.clone(),
            symbol.clone(),
            self.connector.clone(),
            Publisher::new(self.state_tx.clone(), generation),
            cancel.clone(),
        );
        runtime.spawn(session.run());
        info!(%symbol, generation, "Subscribed");

        *active = Some(ActiveSession { symbol, cancel });
        Ok(self.handle())
    }

    /// Stop streaming and clear all retained state.
    ///
    /// Cancels any pending backoff timer and closes the transport without
    /// waiting. Safe to call repeatedly and before any subscribe.
    pub fn unsubscribe(&self) {
        if let Some(session) = self.active.lock().take() {
            info!(symbol = %session.symbol, "Unsubscribed");
            session.cancel.cancel();
        }

        let changed = self.state_tx.send_if_modified(|state| {
            let was_idle =
                state.symbol.is_none() && state.connection.state == ConnectionState::Disconnected;
            *state = FeedState::unsubscribed(state.generation + 1);
            !was_idle
        });
        if changed {
            Metrics::feed_state_set(ConnectionState::Disconnected.as_str());
        }
    }

    /// New handle observing this client's state.
    pub fn handle(&self) -> FeedHandle {
        FeedHandle::new(self.state_tx.subscribe())
    }

    pub fn state(&self) -> FeedState {
        self.state_tx.borrow().clone()
    }

    pub fn symbol(&self) -> Option<String> {
        self.state_tx.borrow().symbol.clone()
    }

    pub fn order_book(&self) -> OrderBookSnapshot {
        self.state_tx.borrow().order_book.clone()
    }

    pub fn recent_trades(&self) -> Vec<Trade> {
        self.state_tx.borrow().recent_trades.clone()
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.state_tx.borrow().connection.clone()
    }
}

impl Drop for MarketFeedClient {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
