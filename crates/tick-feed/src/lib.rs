//! # tick-feed
//!
//! Upstream market data feed for the tickbridge system.
//!
//! Maintains exactly one live WebSocket subscription to a public Binance
//! trade channel for one symbol and exposes it as a lazy, infinite,
//! non-restartable sequence of [`tick_core::TradeEvent`] via the
//! [`tick_core::feed::TradeFeed`] seam.

pub mod binance;

pub use binance::{BinanceFeedConnector, TradeSubscription};
