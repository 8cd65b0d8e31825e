//! Integration tests for depthsync-feed.
//!
//! These tests drive `MarketFeedClient` end to end:
//! - Against a scripted in-process connector (deterministic, paused clock)
//! - Against a local WebSocket server over the real tungstenite transport

pub mod common;
