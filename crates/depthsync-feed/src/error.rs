//! Feed error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("subscribe must be called from within a tokio runtime")]
    NoRuntime,

    #[error("Feed client dropped")]
    Closed,
}

pub type FeedResult<T> = Result<T, FeedError>;
