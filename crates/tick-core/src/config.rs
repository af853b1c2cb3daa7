//! Configuration parsing for the tickbridge system.
//!
//! All settings come from a single JSON config file. Only the symbol and the
//! downstream address are mandatory; everything else has defaults matching
//! the public Binance spot endpoint.
//!
//! # Example config
//!
//! ```json
//! {
//!   "symbol": "BTCUSDT",
//!   "downstream": { "ip": "127.0.0.1", "port": 12345 },
//!   "feed": { "ws_url": "wss://stream.binance.com:443/ws" },
//!   "progress_every": 50,
//!   "log_path": "/tmp/tickbridge"
//! }
//! ```

use serde::Deserialize;

/// Default upstream WebSocket endpoint (Binance spot, public streams).
pub const DEFAULT_WS_URL: &str = "wss://stream.binance.com:443/ws";

/// Default progress-log cadence: one info line per 50 forwarded trades.
pub const DEFAULT_PROGRESS_EVERY: u64 = 50;

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Instrument symbol to subscribe (case-insensitive in the file;
    /// upper-cased on the wire, lower-cased in the stream name).
    pub symbol: String,

    /// Downstream engine TCP address.
    pub downstream: DownstreamConfig,

    /// Upstream feed settings (optional — defaults to Binance spot).
    pub feed: Option<FeedConfig>,

    /// Emit a progress observation every Nth forwarded trade.
    pub progress_every: Option<u64>,

    /// Optional directory for daily-rotating log files.
    pub log_path: Option<String>,
}

/// Downstream engine address (host + port).
#[derive(Debug, Clone, Deserialize)]
pub struct DownstreamConfig {
    pub ip: String,
    pub port: u16,
}

impl DownstreamConfig {
    /// Address in `host:port` form, as expected by `TcpStream::connect`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

/// Upstream feed settings.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// WebSocket endpoint override.
    pub ws_url: Option<String>,
}

impl BridgeConfig {
    /// Returns the effective WebSocket URL, defaulting to Binance spot.
    pub fn effective_ws_url(&self) -> String {
        self.feed
            .as_ref()
            .and_then(|f| f.ws_url.clone())
            .unwrap_or_else(|| DEFAULT_WS_URL.to_string())
    }

    /// Returns the effective progress cadence (default: every 50th trade).
    /// A configured value of 0 is treated as the default.
    pub fn effective_progress_every(&self) -> u64 {
        match self.progress_every {
            Some(0) | None => DEFAULT_PROGRESS_EVERY,
            Some(n) => n,
        }
    }
}

/// Load and parse a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<BridgeConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: BridgeConfig = serde_json::from_str(&content)?;
    Ok(config)
}
