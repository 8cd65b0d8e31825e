//! Live order book and trade feed for depthsync.
//!
//! `MarketFeedClient` keeps one streaming subscription per symbol, maintains
//! the order book and recent trades from snapshot/update/trade events, and
//! reconnects with capped exponential backoff. Consumers observe state through
//! [`FeedHandle`].

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod handle;
mod session;
pub mod state;

pub use client::MarketFeedClient;
pub use config::FeedConfig;
pub use engine::{DropReason, EngineOutcome, FeedEngine};
pub use error::{FeedError, FeedResult};
pub use handle::FeedHandle;
pub use state::{ConnectionState, ConnectionStatus, FeedState};
