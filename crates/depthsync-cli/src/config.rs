//! Application configuration.

use crate::error::{AppError, AppResult};
use depthsync_feed::FeedConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "DEPTHSYNC_CONFIG";

/// Config file used when neither `--config` nor the environment names one.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Symbol to stream (e.g., "BTCUSDT").
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// Interval between book summary log lines (ms, 0 = disabled). Default: 10,000.
    #[serde(default = "default_summary_interval_ms")]
    pub summary_interval_ms: u64,
    #[serde(default)]
    pub feed: FeedConfig,
}

fn default_symbol() -> String {
    "BTCUSDT".to_string()
}

fn default_summary_interval_ms() -> u64 {
    10_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            summary_interval_ms: default_summary_interval_ms(),
            feed: FeedConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Resolve the config path: explicit argument, then `DEPTHSYNC_CONFIG`, then the default.
    pub fn resolve_path(explicit: Option<String>, env: Option<String>) -> String {
        explicit
            .or(env)
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, symbol: Option<String>, url: Option<String>) -> Self {
        if let Some(symbol) = symbol {
            self.symbol = symbol;
        }
        if let Some(url) = url {
            self.feed.url = url;
        }
        self
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.symbol.trim().is_empty() {
            return Err(AppError::Config("symbol must not be empty".to_string()));
        }
        self.feed.validate()?;
        Ok(())
    }
}
