//! Read-only view of a feed client's state.

use crate::error::{FeedError, FeedResult};
use crate::state::{ConnectionState, ConnectionStatus, FeedState};
use depthsync_core::{BookMetrics, OrderBookSnapshot, Trade};
use tokio::sync::watch;

/// Cloneable observer of [`FeedState`].
#[derive(Debug, Clone)]
pub struct FeedHandle {
    rx: watch::Receiver<FeedState>,
}

impl FeedHandle {
    pub(crate) fn new(rx: watch::Receiver<FeedState>) -> Self {
        Self { rx }
    }

    /// Clone of the current state.
    pub fn state(&self) -> FeedState {
        self.rx.borrow().clone()
    }

    pub fn symbol(&self) -> Option<String> {
        self.rx.borrow().symbol.clone()
    }

    pub fn order_book(&self) -> OrderBookSnapshot {
        self.rx.borrow().order_book.clone()
    }

    /// Most recent first.
    pub fn recent_trades(&self) -> Vec<Trade> {
        self.rx.borrow().recent_trades.clone()
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.rx.borrow().connection.clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.rx.borrow().connection.state
    }

    pub fn attempt(&self) -> u32 {
        self.rx.borrow().connection.attempt
    }

    pub fn last_error(&self) -> Option<String> {
        self.rx.borrow().connection.last_error.clone()
    }

    pub fn is_stale(&self) -> bool {
        self.rx.borrow().stale
    }

    /// Spread, mid and volume split of the current book.
    pub fn metrics(&self) -> BookMetrics {
        self.rx.borrow().metrics()
    }

    /// Whether state changed since it was last observed through this handle.
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Wait for the next state change.
    pub async fn changed(&mut self) -> FeedResult<()> {
        self.rx.changed().await.map_err(|_| FeedError::Closed)
    }

    /// Wait until `predicate` holds and return the matching state.
    pub async fn wait_for(
        &mut self,
        mut predicate: impl FnMut(&FeedState) -> bool,
    ) -> FeedResult<FeedState> {
        let state = self
            .rx
            .wait_for(|state| predicate(state))
            .await
            .map_err(|_| FeedError::Closed)?;
        Ok(state.clone())
    }
}
