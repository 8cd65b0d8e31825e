//! Wire message types.
//!
//! Inbound market-data frames are JSON objects tagged by `type`:
//! - `snapshot`: full book replacement
//! - `update`: incremental level deltas
//! - `trade`: one trade print
//! - `error`: server-side protocol error (e.g. unknown symbol)
//!
//! Responses to control frames carry an `id` and no `type`. Outbound control
//! frames use `{"method": "SUBSCRIBE"|"UNSUBSCRIBE", "params": [...], "id": N}`.
//!
//! Numeric fields are accepted either as JSON numbers or as decimal strings.

use crate::error::{WsError, WsResult};
use depthsync_core::{BookSide, Price, Side, Size, Trade};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Event types this client understands.
const KNOWN_EVENT_TYPES: [&str; 4] = ["snapshot", "update", "trade", "error"];

// ============================================================================
// Inbound events
// ============================================================================

/// A `[price, amount]` pair as sent on the wire.
pub type RawLevel = (Decimal, Decimal);

/// Book payload shared by `snapshot` and `update` events.
#[derive(Debug, Clone, Deserialize)]
pub struct BookPayload {
    pub symbol: String,
    #[serde(default, alias = "b")]
    pub bids: Vec<RawLevel>,
    #[serde(default, alias = "a")]
    pub asks: Vec<RawLevel>,
    /// Monotonic update id, when the upstream provides one.
    #[serde(default, rename = "updateId", alias = "u")]
    pub update_id: Option<u64>,
}

impl BookPayload {
    /// Raw levels of one side.
    pub fn levels(&self, side: BookSide) -> &[RawLevel] {
        match side {
            BookSide::Bid => &self.bids,
            BookSide::Ask => &self.asks,
        }
    }

    /// Typed levels of one side.
    pub fn typed_levels(&self, side: BookSide) -> impl Iterator<Item = (Price, Size)> + '_ {
        self.levels(side)
            .iter()
            .map(|(p, a)| (Price::new(*p), Size::new(*a)))
    }

    /// Reject non-positive prices, negative amounts and sides whose amounts
    /// cannot be summed.
    ///
    /// A payload that fails validation is dropped whole so a single bad
    /// level never leaves the book half-updated.
    pub fn validate(&self) -> WsResult<()> {
        for side in [BookSide::Bid, BookSide::Ask] {
            let mut volume = Decimal::ZERO;
            for (price, amount) in self.levels(side) {
                if price.is_sign_negative() || price.is_zero() {
                    return Err(WsError::Malformed(format!(
                        "{side} level has non-positive price {price}"
                    )));
                }
                if amount.is_sign_negative() && !amount.is_zero() {
                    return Err(WsError::Malformed(format!(
                        "{side} level {price} has negative amount {amount}"
                    )));
                }
                volume = volume.checked_add(*amount).ok_or_else(|| {
                    WsError::Malformed(format!("{side} volume overflows at level {price}"))
                })?;
            }
        }
        Ok(())
    }
}

/// Trade id as sent on the wire (string or integer).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TradeId {
    Text(String),
    Number(u64),
}

impl std::fmt::Display for TradeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Trade payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TradePayload {
    pub symbol: String,
    pub id: TradeId,
    #[serde(alias = "p")]
    pub price: Decimal,
    #[serde(alias = "q", alias = "qty")]
    pub amount: Decimal,
    pub side: Side,
    #[serde(alias = "time", alias = "T")]
    pub timestamp: i64,
}

impl TradePayload {
    /// Validate and convert into a domain trade.
    pub fn into_trade(self) -> WsResult<Trade> {
        if self.price.is_sign_negative() || self.price.is_zero() {
            return Err(WsError::Malformed(format!(
                "trade {} has non-positive price {}",
                self.id, self.price
            )));
        }
        if self.amount.is_sign_negative() || self.amount.is_zero() {
            return Err(WsError::Malformed(format!(
                "trade {} has non-positive amount {}",
                self.id, self.amount
            )));
        }
        Ok(Trade {
            id: self.id.to_string(),
            price: Price::new(self.price),
            amount: Size::new(self.amount),
            side: self.side,
            timestamp: self.timestamp,
        })
    }
}

/// Server-pushed protocol error.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(alias = "msg")]
    pub message: String,
}

/// Typed market-data event.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedEvent {
    Snapshot(BookPayload),
    Update(BookPayload),
    Trade(TradePayload),
    Error(ErrorPayload),
}

impl FeedEvent {
    /// Symbol the event refers to, if any.
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::Snapshot(b) | Self::Update(b) => Some(&b.symbol),
            Self::Trade(t) => Some(&t.symbol),
            Self::Error(e) => e.symbol.as_deref(),
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Snapshot(_) => "snapshot",
            Self::Update(_) => "update",
            Self::Trade(_) => "trade",
            Self::Error(_) => "error",
        }
    }
}

// ============================================================================
// Control responses
// ============================================================================

/// Error body of a rejected control frame.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlError {
    #[serde(default)]
    pub code: i64,
    #[serde(alias = "message")]
    pub msg: String,
}

/// Response to a SUBSCRIBE/UNSUBSCRIBE frame.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlResponse {
    pub id: u64,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<ControlError>,
}

impl ControlResponse {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Any parsed inbound text frame.
#[derive(Debug, Clone)]
pub enum InboundMessage {
    Event(FeedEvent),
    Response(ControlResponse),
}

/// Parse one inbound text frame.
///
/// Never panics. Invalid JSON, unknown `type` values and shape mismatches
/// come back as errors for which [`WsError::is_malformed`] holds.
pub fn parse_inbound(text: &str) -> WsResult<InboundMessage> {
    let value: serde_json::Value = serde_json::from_str(text)?;

    let Some(obj) = value.as_object() else {
        return Err(WsError::Malformed("frame is not a JSON object".to_string()));
    };

    if let Some(kind) = obj.get("type") {
        let known = kind
            .as_str()
            .is_some_and(|k| KNOWN_EVENT_TYPES.contains(&k));
        if !known {
            return Err(WsError::UnknownMessage(kind.to_string()));
        }
        return serde_json::from_value::<FeedEvent>(value)
            .map(InboundMessage::Event)
            .map_err(|e| WsError::Malformed(e.to_string()));
    }

    if obj.contains_key("id") {
        return serde_json::from_value::<ControlResponse>(value)
            .map(InboundMessage::Response)
            .map_err(|e| WsError::Malformed(format!("control response: {e}")));
    }

    Err(WsError::Malformed("missing `type` field".to_string()))
}

// ============================================================================
// Outbound control frames
// ============================================================================

/// Control frame method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ControlMethod {
    Subscribe,
    Unsubscribe,
}

impl std::fmt::Display for ControlMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Subscribe => write!(f, "SUBSCRIBE"),
            Self::Unsubscribe => write!(f, "UNSUBSCRIBE"),
        }
    }
}

/// Outgoing control frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlFrame {
    pub method: ControlMethod,
    pub params: Vec<String>,
    pub id: u64,
}

impl ControlFrame {
    /// Create a subscribe frame.
    pub fn subscribe(params: Vec<String>, id: u64) -> Self {
        Self {
            method: ControlMethod::Subscribe,
            params,
            id,
        }
    }

    /// Create an unsubscribe frame.
    pub fn unsubscribe(params: Vec<String>, id: u64) -> Self {
        Self {
            method: ControlMethod::Unsubscribe,
            params,
            id,
        }
    }

    pub fn to_json(&self) -> WsResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
