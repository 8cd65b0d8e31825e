//! WebSocket plumbing for depthsync.
//!
//! Provides:
//! - Typed wire messages with a defensive parser (unknown/malformed frames are errors, never panics)
//! - SUBSCRIBE/UNSUBSCRIBE control frames and response matching
//! - Exponential backoff policy with cap and attempt budget
//! - Heartbeat monitoring (idle ping, two-interval liveness window)
//! - `Connector`/`FeedTransport` traits and a tokio-tungstenite implementation

pub mod backoff;
pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod message;
pub mod subscription;
pub mod transport;

pub use backoff::BackoffPolicy;
pub use connection::{TungsteniteConnector, TungsteniteTransport};
pub use error::{WsError, WsResult};
pub use heartbeat::HeartbeatMonitor;
pub use message::{
    parse_inbound, BookPayload, ControlError, ControlFrame, ControlMethod, ControlResponse,
    ErrorPayload, FeedEvent, InboundMessage, TradePayload,
};
pub use subscription::{normalize_symbol, stream_names, AckOutcome, StreamKind, SubscriptionTracker};
pub use transport::{BoxFuture, Connector, FeedTransport, TransportEvent};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
