//! Shared test doubles.

#![allow(dead_code)]

pub mod mock_connector;
pub mod mock_ws;
