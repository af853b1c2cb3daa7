//! Upstream feed seam.
//!
//! The bridge consumes trades through these traits so its state machine can
//! be exercised with scripted feeds in tests. The production implementation
//! lives in `tick-feed` (`TradeSubscription`).
//!
//! Only `Send` is required (not `Sync`): a feed is owned exclusively by one
//! bridge run and is never shared.

use async_trait::async_trait;

use crate::error::BridgeError;
use crate::types::TradeEvent;

/// A live, non-restartable sequence of trade events.
#[async_trait]
pub trait TradeFeed: Send {
    /// Suspend until the next trade arrives.
    ///
    /// Non-trade and malformed upstream messages are absorbed internally and
    /// never observable here. Returns `None` once the subscription has ended
    /// (close frame, read error) — a fresh open is required after that.
    async fn next(&mut self) -> Option<TradeEvent>;

    /// Release the subscription. Idempotent; safe after a partial failure.
    async fn close(&mut self);
}

/// Opens a [`TradeFeed`]. A dropped subscription needs a fresh `open`.
#[async_trait]
pub trait FeedConnector: Send {
    type Feed: TradeFeed;

    /// Establish the subscription. Fails with
    /// [`BridgeError::UpstreamUnavailable`] if the session cannot be created.
    async fn open(&self) -> Result<Self::Feed, BridgeError>;
}
