//! # tick-runner
//!
//! Main entry point for the tickbridge system.
//!
//! Loads a JSON configuration file, wires the upstream trade subscription to
//! the downstream forwarding bridge, and runs until interrupted or until the
//! bridge reports a terminal failure.
//!
//! # Usage
//!
//! ```bash
//! tick-runner config.json --log-level info
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tick_bridge::{ForwardingBridge, TcpConnector};
use tick_feed::BinanceFeedConnector;
use tokio::sync::watch;
use tracing::{error, info};

/// Live trade ingestion-and-forwarding bridge.
#[derive(Parser)]
#[command(name = "tick-runner", about = "Live trade feed-to-engine forwarding bridge")]
struct Cli {
    /// Configuration file path (JSON).
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output (overrides config `log_path`).
    #[arg(long)]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let config = tick_core::config::load_config(&cli.config)?;

    // 2. Initialize logging
    let log_dir = cli.log_dir.clone().or_else(|| config.log_path.clone());
    tick_core::logging::init_logging(&cli.log_level, log_dir.as_deref(), "tick-runner");

    info!(
        "tick-runner starting — symbol={}, downstream={}, feed={}",
        config.symbol,
        config.downstream.address(),
        config.effective_ws_url(),
    );

    // 3. Build the bridge: downstream connector + upstream connector
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let feed_connector = BinanceFeedConnector {
        ws_url: config.effective_ws_url(),
        symbol: config.symbol.clone(),
    };
    let sink_connector = TcpConnector::new(config.downstream.address());
    let mut bridge = ForwardingBridge::new(
        feed_connector,
        sink_connector,
        config.effective_progress_every(),
        shutdown_rx,
    );

    let mut handle = tokio::spawn(async move { bridge.run().await });

    // 4. Run until Ctrl+C or terminal bridge failure
    let outcome = tokio::select! {
        res = &mut handle => res?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
            (&mut handle).await?
        }
    };

    match outcome {
        Ok(()) => {
            info!("bridge stopped — goodbye");
            Ok(())
        }
        Err(e) => {
            error!("bridge terminated: {e}");
            Err(e.into())
        }
    }
}
