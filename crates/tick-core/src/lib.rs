//! # tick-core
//!
//! Core crate for the tickbridge system, providing:
//!
//! - **Types** (`types`) — the normalized [`TradeEvent`] record
//! - **Wire codec** (`wire`) — the 8-field CSV line format sent downstream
//! - **Error types** (`error`) — domain-specific [`BridgeError`] via thiserror
//! - **Configuration** (`config`) — JSON config deserialization
//! - **Feed seam** (`feed`) — traits the upstream subscription implements
//! - **Sink seam** (`sink`) — traits the downstream connection implements
//! - **Time utilities** (`time_util`) — epoch timestamps for latency logging
//! - **Logging** (`logging`) — tracing-based structured logging

pub mod config;
pub mod error;
pub mod feed;
pub mod logging;
pub mod sink;
pub mod time_util;
pub mod types;
pub mod wire;

// Re-export the most widely used items at the crate root.
pub use error::BridgeError;
pub use types::TradeEvent;
