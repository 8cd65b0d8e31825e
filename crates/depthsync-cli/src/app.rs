//! Main application.

use crate::config::AppConfig;
use crate::error::AppResult;
use depthsync_feed::{ConnectionState, ConnectionStatus, FeedHandle, FeedState, MarketFeedClient};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of one [`Application::run_until`] call.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// State changes observed.
    pub changes: u64,
    /// Trades observed.
    pub trades: u64,
    pub last_state: FeedState,
}

impl RunSummary {
    /// The feed stopped on its own: a protocol error or exhausted retries.
    pub fn feed_stopped(&self) -> bool {
        is_terminal(&self.last_state.connection)
    }
}

fn is_terminal(status: &ConnectionStatus) -> bool {
    match status.state {
        ConnectionState::Error => true,
        ConnectionState::Disconnected => status.last_error.is_some(),
        _ => false,
    }
}

/// Streams one symbol and logs what changes.
pub struct Application {
    config: AppConfig,
    client: MarketFeedClient,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        let client = MarketFeedClient::new(config.feed.clone())?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Handle observing the feed this application drives.
    pub fn handle(&self) -> FeedHandle {
        self.client.handle()
    }

    /// Run until Ctrl-C or until the feed stops.
    pub async fn run(&self) -> AppResult<RunSummary> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(?e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received");
        })
        .await
    }

    /// Run until `shutdown` resolves or the feed stops, then unsubscribe.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) -> AppResult<RunSummary> {
        let mut handle = self.client.subscribe(&self.config.symbol)?;
        info!(symbol = %self.config.symbol, url = %self.config.feed.url, "Streaming");

        let mut tracker = ChangeTracker::default();
        tracker.observe(&handle.state());

        let summary_every = Duration::from_millis(self.config.summary_interval_ms.max(1));
        let mut summary = tokio::time::interval(summary_every);
        summary.tick().await;

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                changed = handle.changed() => {
                    changed?;
                    let state = handle.state();
                    tracker.observe(&state);
                    if is_terminal(&state.connection) {
                        warn!(
                            state = %state.connection.state,
                            error = ?state.connection.last_error,
                            "Feed stopped"
                        );
                        break;
                    }
                }
                _ = summary.tick(), if self.config.summary_interval_ms > 0 => {
                    log_summary(&handle.state());
                }
            }
        }

        let last_state = handle.state();
        self.client.unsubscribe();
        info!(changes = tracker.changes, trades = tracker.trades, "Stopped");

        Ok(RunSummary {
            changes: tracker.changes,
            trades: tracker.trades,
            last_state,
        })
    }
}

/// Remembers the last logged view so only differences are reported.
#[derive(Default)]
struct ChangeTracker {
    connection: Option<ConnectionStatus>,
    newest_trade: Option<String>,
    stale: bool,
    changes: u64,
    trades: u64,
}

impl ChangeTracker {
    fn observe(&mut self, state: &FeedState) {
        self.changes += 1;

        if self.connection.as_ref() != Some(&state.connection) {
            let status = &state.connection;
            match status.state {
                ConnectionState::Error | ConnectionState::Reconnecting => warn!(
                    state = %status.state,
                    attempt = status.attempt,
                    error = ?status.last_error,
                    "Connection state changed"
                ),
                _ => info!(
                    state = %status.state,
                    attempt = status.attempt,
                    "Connection state changed"
                ),
            }
            self.connection = Some(status.clone());
        }

        if state.stale != self.stale {
            if state.stale {
                info!("Book is stale, awaiting fresh snapshot");
            }
            self.stale = state.stale;
        }

        let fresh = match &self.newest_trade {
            Some(id) => state
                .recent_trades
                .iter()
                .take_while(|t| &t.id != id)
                .count(),
            None => state.recent_trades.len(),
        };
        for trade in state.recent_trades.iter().take(fresh).rev() {
            debug!(
                id = %trade.id,
                side = %trade.side,
                price = %trade.price,
                amount = %trade.amount,
                "Trade"
            );
        }
        self.trades += fresh as u64;
        self.newest_trade = state.recent_trades.first().map(|t| t.id.clone());
    }
}

fn log_summary(state: &FeedState) {
    let metrics = state.metrics();
    info!(
        symbol = ?state.symbol,
        state = %state.connection.state,
        bids = state.order_book.bids.len(),
        asks = state.order_book.asks.len(),
        best_bid = ?metrics.best_bid.map(|p| p.to_string()),
        best_ask = ?metrics.best_ask.map(|p| p.to_string()),
        spread_bps = ?metrics.spread_bps.map(|d| d.round_dp(2).to_string()),
        bid_volume_pct = ?metrics.bid_volume_pct.map(|d| d.round_dp(1).to_string()),
        "Book summary"
    );
}
