//! Core domain types for depthsync.
//!
//! This crate provides the data model shared by the feed client:
//! - `Price`, `Size`: Precision-safe numeric types
//! - `OrderBook`, `OrderBookSnapshot`, `PriceLevel`: book maintenance and its read-only view
//! - `Trade`, `TradeTape`: trade prints and bounded recent history
//! - `BookMetrics`, `unrealized_pnl`: figures derived from the live book

pub mod book;
pub mod decimal;
pub mod derived;
pub mod error;
pub mod side;
pub mod trade;

pub use book::{LevelChange, OrderBook, OrderBookSnapshot, PriceLevel};
pub use decimal::{Price, Size};
pub use derived::{unrealized_pnl, BookMetrics};
pub use error::{CoreError, CoreResult};
pub use side::{BookSide, Side};
pub use trade::{Trade, TradeTape};
