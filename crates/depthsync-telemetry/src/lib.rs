//! Prometheus metrics and structured logging for depthsync.
//!
//! Provides:
//! - Prometheus metrics for connection state, reconnects, inbound traffic and book depth
//! - Structured logging with tracing (JSON in production, pretty otherwise)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
