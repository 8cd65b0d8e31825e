//! Prometheus metrics for the depthsync feed client.
//!
//! Covers:
//! - Connection state machine
//! - Reconnects and resyncs
//! - Inbound traffic (applied and dropped)
//! - Book depth
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration failure
//! means duplicate metric names, which is a programming error that should
//! surface on first use. It never happens after the statics are initialised.

use crate::error::TelemetryResult;
use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge_vec, Encoder,
    IntCounter, IntCounterVec, IntGaugeVec, TextEncoder,
};

/// Every label value used by [`FEED_STATE`].
pub const CONNECTION_STATES: [&str; 5] = [
    "connecting",
    "connected",
    "reconnecting",
    "disconnected",
    "error",
];

/// Feed connection state (1 = active, 0 = inactive).
/// Labels: state (connecting/connected/reconnecting/disconnected/error)
pub static FEED_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "depthsync_feed_state",
        "Feed connection state machine current state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Reconnect attempts scheduled.
pub static RECONNECT_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "depthsync_reconnect_total",
        "Total reconnect attempts scheduled",
        &["reason"]
    )
    .unwrap()
});

/// Transport connections opened.
pub static CONNECT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "depthsync_connect_total",
        "Total transport connections opened"
    )
    .unwrap()
});

/// Inbound messages applied to state.
pub static MESSAGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "depthsync_messages_total",
        "Inbound messages applied",
        &["kind"]
    )
    .unwrap()
});

/// Inbound messages dropped.
pub static DROPPED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "depthsync_dropped_total",
        "Inbound messages dropped without being applied",
        &["reason"]
    )
    .unwrap()
});

/// Book resyncs triggered by sequence gaps.
pub static RESYNC_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "depthsync_resync_total",
        "Book resyncs triggered by update id gaps"
    )
    .unwrap()
});

/// Levels currently held per book side.
pub static BOOK_DEPTH: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "depthsync_book_depth",
        "Price levels currently held",
        &["side"]
    )
    .unwrap()
});

/// Metrics helper.
pub struct Metrics;

impl Metrics {
    /// Set the feed state. Only the active state is 1.
    pub fn feed_state_set(state: &str) {
        for s in CONNECTION_STATES {
            FEED_STATE.with_label_values(&[s]).set(0);
        }
        FEED_STATE.with_label_values(&[state]).set(1);
    }

    /// Record a scheduled reconnect.
    pub fn reconnect(reason: &str) {
        RECONNECT_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record an opened transport.
    pub fn connected() {
        CONNECT_TOTAL.inc();
    }

    /// Record an applied message.
    pub fn message_applied(kind: &str) {
        MESSAGES_TOTAL.with_label_values(&[kind]).inc();
    }

    /// Record a dropped message.
    pub fn message_dropped(reason: &str) {
        DROPPED_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record a resync.
    pub fn resync() {
        RESYNC_TOTAL.inc();
    }

    /// Update book depth for both sides.
    pub fn book_depth(bids: usize, asks: usize) {
        BOOK_DEPTH.with_label_values(&["bid"]).set(bids as i64);
        BOOK_DEPTH.with_label_values(&["ask"]).set(asks as i64);
    }

    /// Render the default registry in the text exposition format.
    pub fn gather_text() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
