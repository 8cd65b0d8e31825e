//! Consumer-visible feed state.

use chrono::{DateTime, Utc};
use depthsync_core::{BookMetrics, OrderBookSnapshot, Trade};
use serde::Serialize;

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Reconnecting,
    Disconnected,
    Error,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        }
    }

    /// A session is running (or about to retry).
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected | Self::Reconnecting)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection state with attempt counter and last error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    /// Current reconnect attempt (0 while connecting for the first time or connected).
    pub attempt: u32,
    pub last_error: Option<String>,
}

impl ConnectionStatus {
    pub fn disconnected() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempt: 0,
            last_error: None,
        }
    }

    pub fn connecting() -> Self {
        Self {
            state: ConnectionState::Connecting,
            attempt: 0,
            last_error: None,
        }
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::disconnected()
    }
}

/// Everything a consumer may read about the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeedState {
    /// Subscribed symbol, `None` when unsubscribed.
    pub symbol: Option<String>,
    pub order_book: OrderBookSnapshot,
    /// Most recent first.
    pub recent_trades: Vec<Trade>,
    pub connection: ConnectionStatus,
    /// The book is retained from a previous connection and awaits a fresh snapshot.
    pub stale: bool,
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub(crate) generation: u64,
}

impl FeedState {
    /// Fresh state for a new subscription.
    pub(crate) fn subscribing(symbol: String, generation: u64) -> Self {
        Self {
            symbol: Some(symbol),
            connection: ConnectionStatus::connecting(),
            generation,
            ..Default::default()
        }
    }

    /// Cleared state after unsubscribe.
    pub(crate) fn unsubscribed(generation: u64) -> Self {
        Self {
            generation,
            ..Default::default()
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state
    }

    pub fn metrics(&self) -> BookMetrics {
        BookMetrics::from_snapshot(&self.order_book)
    }
}
