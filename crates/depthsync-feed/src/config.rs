//! Feed client configuration.

use crate::error::{FeedError, FeedResult};
use depthsync_ws::BackoffPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection and retention settings for one feed client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// WebSocket endpoint.
    #[serde(default = "default_url")]
    pub url: String,
    /// Consecutive failed attempts before giving up (0 = infinite). Default: 10.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// First backoff delay (ms). Default: 1,000.
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    /// Backoff cap (ms). Default: 30,000.
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    /// Random jitter added to each delay (ms). Default: 0.
    #[serde(default)]
    pub reconnect_jitter_ms: u64,
    /// Idle time before a ping is sent (ms, 0 = disabled). Default: 30,000.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Handshake timeout (ms). Default: 10,000.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Levels retained per book side. Default: 50.
    #[serde(default = "default_book_depth")]
    pub book_depth: usize,
    /// Trades retained, most recent first. Default: 50.
    #[serde(default = "default_trade_history")]
    pub trade_history: usize,
}

fn default_url() -> String {
    "wss://stream.example.com/ws".to_string()
}

fn default_max_reconnect_attempts() -> u32 {
    10
}

fn default_reconnect_base_delay_ms() -> u64 {
    1_000
}

fn default_reconnect_max_delay_ms() -> u64 {
    30_000
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_book_depth() -> usize {
    50
}

fn default_trade_history() -> usize {
    50
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            reconnect_jitter_ms: 0,
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            book_depth: default_book_depth(),
            trade_history: default_trade_history(),
        }
    }
}

impl FeedConfig {
    /// Config pointing at `url` with every other field defaulted.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> FeedResult<()> {
        if self.url.trim().is_empty() {
            return Err(FeedError::InvalidConfig("url must not be empty".to_string()));
        }
        if self.reconnect_base_delay_ms == 0 {
            return Err(FeedError::InvalidConfig(
                "reconnect_base_delay_ms must be positive".to_string(),
            ));
        }
        if self.reconnect_max_delay_ms < self.reconnect_base_delay_ms {
            return Err(FeedError::InvalidConfig(format!(
                "reconnect_max_delay_ms ({}) is below reconnect_base_delay_ms ({})",
                self.reconnect_max_delay_ms, self.reconnect_base_delay_ms
            )));
        }
        if self.connect_timeout_ms == 0 {
            return Err(FeedError::InvalidConfig(
                "connect_timeout_ms must be positive".to_string(),
            ));
        }
        if self.book_depth == 0 || self.trade_history == 0 {
            return Err(FeedError::InvalidConfig(
                "book_depth and trade_history must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            base_delay_ms: self.reconnect_base_delay_ms,
            max_delay_ms: self.reconnect_max_delay_ms,
            jitter_ms: self.reconnect_jitter_ms,
            max_attempts: self.max_reconnect_attempts,
        }
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
