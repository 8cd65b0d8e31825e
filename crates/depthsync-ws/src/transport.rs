//! Transport abstraction.
//!
//! The feed session talks to the network only through these traits, so the
//! connection state machine can be driven by a scripted transport in tests
//! and by tokio-tungstenite in production.

use crate::error::WsResult;
use std::future::Future;
use std::pin::Pin;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Event surfaced by an open transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame.
    Text(String),
    /// Reply to one of our pings.
    Pong,
    /// The peer closed the connection (or the stream ended).
    Closed { code: u16, reason: String },
}

/// One open connection.
pub trait FeedTransport: Send {
    /// Send a text frame.
    fn send_text(&mut self, text: String) -> BoxFuture<'_, WsResult<()>>;

    /// Send a liveness ping.
    fn send_ping(&mut self) -> BoxFuture<'_, WsResult<()>>;

    /// Wait for the next event. Must be cancel-safe.
    fn next_event(&mut self) -> BoxFuture<'_, WsResult<TransportEvent>>;

    /// Best-effort graceful close.
    fn close(&mut self) -> BoxFuture<'_, ()>;
}

/// Factory for transports.
pub trait Connector: Send + Sync {
    /// Open a connection to `url`.
    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, WsResult<Box<dyn FeedTransport>>>;
}
