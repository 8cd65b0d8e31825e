//! Integration tests for the depthsync binary crate.
//!
//! These tests run `Application` against a local WebSocket server.

pub mod common;
