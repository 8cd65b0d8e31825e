//! Order book maintenance.
//!
//! `OrderBook` is the mutable book owned by a single feed session. Each side
//! is kept in a price-keyed `BTreeMap`, so inserting a new level never
//! disturbs ordering and no re-sort pass is needed. Consumers never see the
//! maps directly: they read an [`OrderBookSnapshot`], whose levels carry the
//! cumulative `total` column computed in one pass per side.

use crate::error::{CoreError, CoreResult};
use crate::{BookSide, Price, Size};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single price level as exposed to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Price,
    pub amount: Size,
    /// Sum of `amount` over this level and every better level on its side.
    pub total: Size,
}

impl PriceLevel {
    pub fn new(price: Price, amount: Size, total: Size) -> Self {
        Self {
            price,
            amount,
            total,
        }
    }
}

/// Read-only view of both book sides.
///
/// Bids are ordered by descending price, asks by ascending price.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

impl OrderBookSnapshot {
    /// An empty book.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Levels of one side.
    pub fn side(&self, side: BookSide) -> &[PriceLevel] {
        match side {
            BookSide::Bid => &self.bids,
            BookSide::Ask => &self.asks,
        }
    }

    /// Cumulative amount across every displayed level of one side.
    pub fn side_volume(&self, side: BookSide) -> Size {
        self.side(side).last().map(|l| l.total).unwrap_or(Size::ZERO)
    }

    /// Verify ordering, uniqueness and cumulative totals on both sides.
    pub fn validate(&self) -> CoreResult<()> {
        validate_side(&self.bids, BookSide::Bid)?;
        validate_side(&self.asks, BookSide::Ask)
    }
}

fn validate_side(levels: &[PriceLevel], side: BookSide) -> CoreResult<()> {
    let mut running = Size::ZERO;
    for (i, level) in levels.iter().enumerate() {
        running = running.checked_add(level.amount).ok_or_else(|| {
            CoreError::BookInvariant(format!("{side} total overflows at index {i}"))
        })?;
        if level.total != running {
            return Err(CoreError::BookInvariant(format!(
                "{side} total at index {i} is {}, expected {running}",
                level.total
            )));
        }
        if let Some(prev) = i.checked_sub(1).map(|j| levels[j].price) {
            let ordered = match side {
                BookSide::Bid => level.price < prev,
                BookSide::Ask => level.price > prev,
            };
            if !ordered {
                return Err(CoreError::BookInvariant(format!(
                    "{side} price {} out of order after {prev}",
                    level.price
                )));
            }
        }
    }
    Ok(())
}

/// Result of applying one delta to the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelChange {
    Inserted,
    Replaced,
    Removed,
    /// Zero-amount delete for a price that was not in the book.
    Unchanged,
}

/// Mutable order book for one symbol.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    bids: BTreeMap<Price, Size>,
    asks: BTreeMap<Price, Size>,
    /// Maximum retained levels per side (`None` = unbounded).
    max_depth: Option<usize>,
}

impl OrderBook {
    /// Create an unbounded book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a book retaining at most `depth` levels per side.
    pub fn with_max_depth(depth: usize) -> Self {
        Self {
            max_depth: Some(depth),
            ..Self::default()
        }
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Replace both sides wholesale.
    ///
    /// Zero-amount levels are skipped. If a price repeats, the later entry wins.
    /// Fails without touching the book if a side's volume overflows.
    pub fn apply_snapshot<B, A>(&mut self, bids: B, asks: A) -> CoreResult<()>
    where
        B: IntoIterator<Item = (Price, Size)>,
        A: IntoIterator<Item = (Price, Size)>,
    {
        let mut new_bids: BTreeMap<Price, Size> =
            bids.into_iter().filter(|(_, a)| !a.is_zero()).collect();
        let mut new_asks: BTreeMap<Price, Size> =
            asks.into_iter().filter(|(_, a)| !a.is_zero()).collect();
        trim(&mut new_bids, BookSide::Bid, self.max_depth);
        trim(&mut new_asks, BookSide::Ask, self.max_depth);
        check_volume(&new_bids, BookSide::Bid)?;
        check_volume(&new_asks, BookSide::Ask)?;

        self.bids = new_bids;
        self.asks = new_asks;
        Ok(())
    }

    /// Apply one `(price, amount)` delta; `amount == 0` removes the level.
    pub fn apply_delta(
        &mut self,
        side: BookSide,
        price: Price,
        amount: Size,
    ) -> CoreResult<LevelChange> {
        let previous = self.amount_at(side, price);
        self.apply_deltas(side, [(price, amount)])?;
        Ok(match (previous, amount.is_zero()) {
            (None, true) => LevelChange::Unchanged,
            (Some(_), true) => LevelChange::Removed,
            (Some(_), false) => LevelChange::Replaced,
            (None, false) => LevelChange::Inserted,
        })
    }

    /// Apply every delta of one side, then trim to depth. Returns the number
    /// of levels that changed. All or nothing.
    pub fn apply_deltas<I>(&mut self, side: BookSide, deltas: I) -> CoreResult<usize>
    where
        I: IntoIterator<Item = (Price, Size)>,
    {
        let mut levels = self.side_mut(side).clone();
        let changed = apply_side(&mut levels, side, self.max_depth, deltas)?;
        *self.side_mut(side) = levels;
        Ok(changed)
    }

    /// Apply bid and ask deltas of one incremental message. All or nothing.
    pub fn apply_update<B, A>(&mut self, bids: B, asks: A) -> CoreResult<usize>
    where
        B: IntoIterator<Item = (Price, Size)>,
        A: IntoIterator<Item = (Price, Size)>,
    {
        let mut new_bids = self.bids.clone();
        let mut new_asks = self.asks.clone();
        let changed = apply_side(&mut new_bids, BookSide::Bid, self.max_depth, bids)?
            + apply_side(&mut new_asks, BookSide::Ask, self.max_depth, asks)?;

        self.bids = new_bids;
        self.asks = new_asks;
        Ok(changed)
    }

    /// Remove every level.
    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Number of levels on one side.
    pub fn depth(&self, side: BookSide) -> usize {
        match side {
            BookSide::Bid => self.bids.len(),
            BookSide::Ask => self.asks.len(),
        }
    }

    pub fn best_bid(&self) -> Option<(Price, Size)> {
        self.bids.iter().next_back().map(|(p, a)| (*p, *a))
    }

    pub fn best_ask(&self) -> Option<(Price, Size)> {
        self.asks.iter().next().map(|(p, a)| (*p, *a))
    }

    /// Amount resting at an exact price.
    pub fn amount_at(&self, side: BookSide, price: Price) -> Option<Size> {
        match side {
            BookSide::Bid => self.bids.get(&price).copied(),
            BookSide::Ask => self.asks.get(&price).copied(),
        }
    }

    /// Build the consumer view with cumulative totals.
    pub fn snapshot(&self) -> OrderBookSnapshot {
        OrderBookSnapshot {
            bids: cumulative(self.bids.iter().rev()),
            asks: cumulative(self.asks.iter()),
        }
    }

    fn side_mut(&mut self, side: BookSide) -> &mut BTreeMap<Price, Size> {
        match side {
            BookSide::Bid => &mut self.bids,
            BookSide::Ask => &mut self.asks,
        }
    }
}

/// Apply deltas to one side, trim it and check that its volume is representable.
fn apply_side<I>(
    levels: &mut BTreeMap<Price, Size>,
    side: BookSide,
    max_depth: Option<usize>,
    deltas: I,
) -> CoreResult<usize>
where
    I: IntoIterator<Item = (Price, Size)>,
{
    let mut changed = 0;
    for (price, amount) in deltas {
        let touched = if amount.is_zero() {
            levels.remove(&price).is_some()
        } else {
            levels.insert(price, amount);
            true
        };
        if touched {
            changed += 1;
        }
    }
    trim(levels, side, max_depth);
    check_volume(levels, side)?;
    Ok(changed)
}

/// Drop the worst levels beyond `max_depth`.
fn trim(levels: &mut BTreeMap<Price, Size>, side: BookSide, max_depth: Option<usize>) {
    let Some(depth) = max_depth else {
        return;
    };
    // Worst bid is the lowest price, worst ask the highest.
    while levels.len() > depth {
        match side {
            BookSide::Bid => levels.pop_first(),
            BookSide::Ask => levels.pop_last(),
        };
    }
}

/// Amounts must be non-negative and sum to a representable side volume.
fn check_volume(levels: &BTreeMap<Price, Size>, side: BookSide) -> CoreResult<()> {
    let mut total = Size::ZERO;
    for (price, amount) in levels {
        if amount.is_negative() {
            return Err(CoreError::InvalidSize(format!(
                "{side} amount {amount} at {price} is negative"
            )));
        }
        total = total
            .checked_add(*amount)
            .ok_or_else(|| CoreError::InvalidSize(format!("{side} volume overflows")))?;
    }
    Ok(())
}

fn cumulative<'a, I>(levels: I) -> Vec<PriceLevel>
where
    I: Iterator<Item = (&'a Price, &'a Size)>,
{
    // Side volume is checked on every mutation, so prefix sums cannot overflow.
    let mut total = Size::ZERO;
    levels
        .map(|(price, amount)| {
            total += *amount;
            PriceLevel::new(*price, *amount, total)
        })
        .collect()
}
