//! Executed trades and the bounded recent-trade tape.

use crate::{Price, Side, Size};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A trade print received from the feed. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub price: Price,
    pub amount: Size,
    /// Aggressor side.
    pub side: Side,
    /// Exchange timestamp in milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl Trade {
    /// Exchange timestamp as a UTC datetime, if representable.
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// Quote-currency value of the trade.
    pub fn notional(&self) -> rust_decimal::Decimal {
        self.amount.notional(self.price)
    }
}

/// Most-recent-first trade history with a fixed capacity.
///
/// Pushing beyond capacity evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct TradeTape {
    trades: VecDeque<Trade>,
    capacity: usize,
}

impl TradeTape {
    pub fn new(capacity: usize) -> Self {
        Self {
            trades: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record a new trade at the front. Returns the evicted trade, if any.
    pub fn push(&mut self, trade: Trade) -> Option<Trade> {
        if self.capacity == 0 {
            return Some(trade);
        }
        self.trades.push_front(trade);
        if self.trades.len() > self.capacity {
            self.trades.pop_back()
        } else {
            None
        }
    }

    pub fn latest(&self) -> Option<&Trade> {
        self.trades.front()
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn clear(&mut self) {
        self.trades.clear();
    }

    /// Iterate newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter()
    }

    /// Copy of the tape, newest first.
    pub fn to_vec(&self) -> Vec<Trade> {
        self.trades.iter().cloned().collect()
    }
}
