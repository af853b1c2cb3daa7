//! Core data types for the trade bridge.

/// One normalized trade observation from the upstream feed.
///
/// Constructed transiently per incoming notification and handed to the wire
/// encoder; the bridge never buffers or replays events.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeEvent {
    /// Event timestamp in milliseconds since epoch, as reported upstream.
    /// Authoritative ordering key within a symbol.
    pub exchange_time_ms: u64,

    /// Uppercase instrument identifier (e.g. `BTCUSDT`). Fixed for the
    /// lifetime of a subscription. Must not contain commas.
    pub symbol: String,

    /// Trade id assigned by the upstream source — monotonically increasing
    /// per symbol, not unique across symbols.
    pub trade_id: u64,

    /// Executed price. Positive; rendered with 8 fractional digits on the wire.
    pub price: f64,

    /// Executed quantity. Positive; same wire precision as `price`.
    pub quantity: f64,

    /// Local receive timestamp in microseconds since epoch. Used only for
    /// feed-latency diagnostics — never written to the wire.
    pub local_time_us: u64,
}
