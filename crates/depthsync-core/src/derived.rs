//! Metrics derived from the live book for display.

use crate::{BookSide, OrderBookSnapshot, Price, Side, Size};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Top-of-book and volume-share figures for one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMetrics {
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    /// `best_ask - best_bid`; `None` unless both sides are present.
    pub spread: Option<Price>,
    pub mid: Option<Price>,
    pub spread_bps: Option<Decimal>,
    /// Displayed bid volume (cumulative total of the last bid level).
    pub bid_volume: Size,
    pub ask_volume: Size,
    /// Share of displayed volume on the bid side, in percent.
    pub bid_volume_pct: Option<Decimal>,
    pub ask_volume_pct: Option<Decimal>,
}

impl BookMetrics {
    pub fn from_snapshot(book: &OrderBookSnapshot) -> Self {
        let best_bid = book.best_bid().map(|l| l.price);
        let best_ask = book.best_ask().map(|l| l.price);

        let (spread, mid) = match (best_bid, best_ask) {
            (Some(bid), Some(ask)) => (
                ask.inner().checked_sub(bid.inner()).map(Price::new),
                bid.midpoint(ask),
            ),
            _ => (None, None),
        };
        let spread_bps = match (spread, mid) {
            (Some(spread), Some(mid)) if !mid.is_zero() => spread
                .inner()
                .checked_div(mid.inner())
                .and_then(|ratio| ratio.checked_mul(Decimal::from(10000))),
            _ => None,
        };

        let bid_volume = book.side_volume(BookSide::Bid);
        let ask_volume = book.side_volume(BookSide::Ask);
        // Each side fits on its own; both together may not.
        let (bid_volume_pct, ask_volume_pct) = match bid_volume.checked_add(ask_volume) {
            Some(total) if !total.is_zero() => (
                share_pct(bid_volume, total),
                share_pct(ask_volume, total),
            ),
            _ => (None, None),
        };

        Self {
            best_bid,
            best_ask,
            spread,
            mid,
            spread_bps,
            bid_volume,
            ask_volume,
            bid_volume_pct,
            ask_volume_pct,
        }
    }
}

fn share_pct(part: Size, total: Size) -> Option<Decimal> {
    part.inner()
        .checked_div(total.inner())
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
}

/// Unrealized P&L of an open order or position marked against a live price.
///
/// Long (buy): `(mark - entry) * amount`. Short (sell): `(entry - mark) * amount`.
/// `None` if the result is not representable.
pub fn unrealized_pnl(side: Side, entry: Price, amount: Size, mark: Price) -> Option<Decimal> {
    mark.inner()
        .checked_sub(entry.inner())?
        .checked_mul(amount.inner())?
        .checked_mul(Decimal::from(side.sign()))
}
