//! Subscription tracking for market-data streams.
//!
//! Builds control frames for a symbol's streams, assigns request ids and
//! matches server responses back to the request that produced them.

use crate::message::{ControlFrame, ControlMethod, ControlResponse};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Stream kinds subscribed for every symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Order book snapshots and incremental updates.
    Depth,
    /// Trade prints.
    Trade,
}

impl StreamKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Depth => "depth",
            Self::Trade => "trade",
        }
    }

    /// Stream name for a symbol, e.g. `btcusdt@depth`.
    pub fn stream_name(&self, symbol: &str) -> String {
        format!("{}@{}", symbol.to_lowercase(), self.suffix())
    }
}

/// All stream names for a symbol.
pub fn stream_names(symbol: &str) -> Vec<String> {
    [StreamKind::Depth, StreamKind::Trade]
        .iter()
        .map(|k| k.stream_name(symbol))
        .collect()
}

/// Upper-case, trimmed symbol used as the subscription identity.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Outcome of matching a control response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckOutcome {
    Acknowledged {
        method: ControlMethod,
        streams: Vec<String>,
    },
    Rejected {
        method: ControlMethod,
        streams: Vec<String>,
        reason: String,
    },
    /// Response id matches no outstanding request (e.g. sent before a reconnect).
    Unmatched(u64),
}

#[derive(Debug, Clone)]
struct PendingRequest {
    method: ControlMethod,
    streams: Vec<String>,
}

/// Per-connection subscription state.
///
/// Owned by a single session; reset on every new connection.
#[derive(Debug)]
pub struct SubscriptionTracker {
    next_id: u64,
    pending: HashMap<u64, PendingRequest>,
}

impl SubscriptionTracker {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            pending: HashMap::new(),
        }
    }

    /// Build a SUBSCRIBE frame and record it as pending.
    pub fn subscribe(&mut self, streams: Vec<String>) -> ControlFrame {
        self.request(ControlMethod::Subscribe, streams)
    }

    /// Build an UNSUBSCRIBE frame and record it as pending.
    pub fn unsubscribe(&mut self, streams: Vec<String>) -> ControlFrame {
        self.request(ControlMethod::Unsubscribe, streams)
    }

    fn request(&mut self, method: ControlMethod, streams: Vec<String>) -> ControlFrame {
        let id = self.next_id;
        self.next_id += 1;
        debug!(id, %method, ?streams, "Control frame queued");
        self.pending.insert(
            id,
            PendingRequest {
                method,
                streams: streams.clone(),
            },
        );
        ControlFrame {
            method,
            params: streams,
            id,
        }
    }

    /// Match a response against outstanding requests.
    pub fn handle_response(&mut self, response: &ControlResponse) -> AckOutcome {
        let Some(request) = self.pending.remove(&response.id) else {
            debug!(id = response.id, "Response for unknown request id");
            return AckOutcome::Unmatched(response.id);
        };

        if let Some(error) = &response.error {
            warn!(
                id = response.id,
                method = %request.method,
                code = error.code,
                msg = %error.msg,
                "Control frame rejected"
            );
            return AckOutcome::Rejected {
                method: request.method,
                streams: request.streams,
                reason: error.msg.clone(),
            };
        }

        match request.method {
            ControlMethod::Subscribe => {
                info!(streams = ?request.streams, "Subscription acknowledged");
            }
            ControlMethod::Unsubscribe => {
                debug!(streams = ?request.streams, "Unsubscription acknowledged");
            }
        }
        AckOutcome::Acknowledged {
            method: request.method,
            streams: request.streams,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Forget outstanding requests (called on reconnection).
    pub fn reset(&mut self) {
        self.pending.clear();
    }
}

impl Default for SubscriptionTracker {
    fn default() -> Self {
        Self::new()
    }
}
