//! depthsync command-line viewer.
//!
//! Loads an [`AppConfig`], subscribes a [`depthsync_feed::MarketFeedClient`]
//! to one symbol and logs connection, book and trade changes until shutdown.

pub mod app;
pub mod config;
pub mod error;

pub use app::{Application, RunSummary};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
