//! Message application for one subscription.
//!
//! `FeedEngine` is sans-IO: it turns inbound text frames into book and tape
//! mutations and tells the session what (if anything) it must do next. It
//! never touches the transport itself.
//!
//! Per connection the engine starts out awaiting a snapshot. Updates that
//! arrive before it are dropped, so a reconnect always rebuilds the book from
//! a full snapshot instead of replaying deltas onto stale levels.

use depthsync_core::{BookSide, OrderBook, OrderBookSnapshot, Trade, TradeTape};
use depthsync_ws::{parse_inbound, BookPayload, ControlResponse, FeedEvent, InboundMessage};
use tracing::{debug, info, warn};

/// Why a frame was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Unparseable or inconsistent frame.
    Malformed,
    /// Well-formed JSON with an unrecognised `type`.
    UnknownType,
    /// Event for a symbol other than the subscribed one.
    SymbolMismatch,
    /// Update received before the connection's first snapshot.
    AwaitingSnapshot,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::UnknownType => "unknown_type",
            Self::SymbolMismatch => "symbol_mismatch",
            Self::AwaitingSnapshot => "awaiting_snapshot",
        }
    }
}

/// Result of handling one frame.
#[derive(Debug, Clone)]
pub enum EngineOutcome {
    /// Book replaced wholesale.
    Snapshot,
    /// Incremental levels applied.
    Update,
    /// Trade prepended to the tape.
    Trade,
    Dropped(DropReason),
    /// Update id is not the successor of the last one; the depth stream must
    /// be resubscribed.
    ResyncRequired { expected: u64, received: u64 },
    /// Server-pushed error; the session must stop.
    ProtocolError(String),
    /// Response to a control frame, for the subscription tracker.
    Control(ControlResponse),
}

/// Book and trade state for one subscribed symbol.
#[derive(Debug)]
pub struct FeedEngine {
    symbol: String,
    book: OrderBook,
    tape: TradeTape,
    awaiting_snapshot: bool,
    last_update_id: Option<u64>,
}

impl FeedEngine {
    pub fn new(symbol: impl Into<String>, book_depth: usize, trade_history: usize) -> Self {
        Self {
            symbol: symbol.into(),
            book: OrderBook::with_max_depth(book_depth),
            tape: TradeTape::new(trade_history),
            awaiting_snapshot: true,
            last_update_id: None,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Forget sequencing after a lost or new connection. The retained book
    /// stays visible but stale until the next snapshot replaces it.
    pub fn mark_unsynced(&mut self) {
        self.awaiting_snapshot = true;
        self.last_update_id = None;
    }

    pub fn is_awaiting_snapshot(&self) -> bool {
        self.awaiting_snapshot
    }

    /// Book is retained from before the current (re)sync.
    pub fn is_stale(&self) -> bool {
        self.awaiting_snapshot && !self.book.is_empty()
    }

    pub fn book_snapshot(&self) -> OrderBookSnapshot {
        self.book.snapshot()
    }

    pub fn trades(&self) -> Vec<Trade> {
        self.tape.to_vec()
    }

    pub fn depth(&self, side: BookSide) -> usize {
        self.book.depth(side)
    }

    /// Parse and apply one inbound text frame.
    pub fn handle_text(&mut self, text: &str) -> EngineOutcome {
        match parse_inbound(text) {
            Ok(InboundMessage::Event(event)) => self.handle_event(event),
            Ok(InboundMessage::Response(response)) => EngineOutcome::Control(response),
            Err(e) => {
                let reason = if matches!(e, depthsync_ws::WsError::UnknownMessage(_)) {
                    debug!(error = %e, "Ignoring unknown message type");
                    DropReason::UnknownType
                } else {
                    warn!(error = %e, len = text.len(), "Dropping malformed message");
                    DropReason::Malformed
                };
                EngineOutcome::Dropped(reason)
            }
        }
    }

    fn handle_event(&mut self, event: FeedEvent) -> EngineOutcome {
        if let Some(symbol) = event.symbol() {
            if !symbol.eq_ignore_ascii_case(&self.symbol) {
                debug!(
                    expected = %self.symbol,
                    received = %symbol,
                    kind = event.kind(),
                    "Dropping message for other symbol"
                );
                return EngineOutcome::Dropped(DropReason::SymbolMismatch);
            }
        }

        match event {
            FeedEvent::Snapshot(payload) => self.apply_snapshot(payload),
            FeedEvent::Update(payload) => self.apply_update(payload),
            FeedEvent::Trade(payload) => match payload.into_trade() {
                Ok(trade) => {
                    debug!(id = %trade.id, price = %trade.price, amount = %trade.amount, "Trade");
                    self.tape.push(trade);
                    EngineOutcome::Trade
                }
                Err(e) => {
                    warn!(error = %e, "Dropping malformed trade");
                    EngineOutcome::Dropped(DropReason::Malformed)
                }
            },
            FeedEvent::Error(payload) => {
                let message = match payload.code {
                    Some(code) => format!("server error {code}: {}", payload.message),
                    None => format!("server error: {}", payload.message),
                };
                warn!(symbol = %self.symbol, %message, "Protocol error from server");
                EngineOutcome::ProtocolError(message)
            }
        }
    }

    fn apply_snapshot(&mut self, payload: BookPayload) -> EngineOutcome {
        if let Err(e) = payload.validate() {
            warn!(error = %e, "Dropping malformed snapshot");
            return EngineOutcome::Dropped(DropReason::Malformed);
        }

        if let Err(e) = self.book.apply_snapshot(
            payload.typed_levels(BookSide::Bid),
            payload.typed_levels(BookSide::Ask),
        ) {
            warn!(error = %e, "Dropping unrepresentable snapshot");
            return EngineOutcome::Dropped(DropReason::Malformed);
        }
        if self.awaiting_snapshot {
            info!(
                symbol = %self.symbol,
                bids = self.book.depth(BookSide::Bid),
                asks = self.book.depth(BookSide::Ask),
                update_id = ?payload.update_id,
                "Book synchronised from snapshot"
            );
        }
        self.awaiting_snapshot = false;
        self.last_update_id = payload.update_id;
        EngineOutcome::Snapshot
    }

    fn apply_update(&mut self, payload: BookPayload) -> EngineOutcome {
        if let Err(e) = payload.validate() {
            warn!(error = %e, "Dropping malformed update");
            return EngineOutcome::Dropped(DropReason::Malformed);
        }
        if self.awaiting_snapshot {
            debug!(update_id = ?payload.update_id, "Dropping update while awaiting snapshot");
            return EngineOutcome::Dropped(DropReason::AwaitingSnapshot);
        }

        // Any id other than the exact successor (gap, duplicate or rewind)
        // forces a fresh snapshot.
        if let (Some(previous), Some(received)) = (self.last_update_id, payload.update_id) {
            let expected = previous.wrapping_add(1);
            if received != expected {
                warn!(
                    symbol = %self.symbol,
                    expected,
                    received,
                    "Update id out of sequence, resynchronising book"
                );
                self.awaiting_snapshot = true;
                self.last_update_id = None;
                return EngineOutcome::ResyncRequired { expected, received };
            }
        }

        let changed = match self.book.apply_update(
            payload.typed_levels(BookSide::Bid),
            payload.typed_levels(BookSide::Ask),
        ) {
            Ok(changed) => changed,
            Err(e) => {
                warn!(error = %e, "Dropping unrepresentable update");
                return EngineOutcome::Dropped(DropReason::Malformed);
            }
        };
        if payload.update_id.is_some() {
            self.last_update_id = payload.update_id;
        }
        debug!(changed, update_id = ?payload.update_id, "Update applied");
        EngineOutcome::Update
    }
}
