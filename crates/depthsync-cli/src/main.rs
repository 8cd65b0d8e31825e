//! depthsync - live order book and trade viewer.

use anyhow::Result;
use clap::Parser;
use depthsync_cli::{AppConfig, Application};
use tracing::info;

/// Stream a symbol's order book and trades and log every change.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via DEPTHSYNC_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Symbol to stream, overriding the config file
    #[arg(short, long)]
    symbol: Option<String>,

    /// WebSocket endpoint, overriding the config file
    #[arg(short, long)]
    url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    depthsync_telemetry::init_logging()?;

    info!("Starting depthsync v{}", env!("CARGO_PKG_VERSION"));

    let config_path = AppConfig::resolve_path(
        args.config,
        std::env::var(depthsync_cli::config::CONFIG_ENV).ok(),
    );
    info!(config_path = %config_path, "Loading configuration");

    let config = AppConfig::from_file(&config_path)?.with_overrides(args.symbol, args.url);
    info!(symbol = %config.symbol, url = %config.feed.url, "Configuration loaded");

    let app = Application::new(config)?;
    let summary = app.run().await?;

    if summary.feed_stopped() {
        anyhow::bail!(
            "feed stopped: {}",
            summary
                .last_state
                .connection
                .last_error
                .unwrap_or_else(|| summary.last_state.connection.state.to_string())
        );
    }
    Ok(())
}
