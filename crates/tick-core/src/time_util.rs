//! Epoch timestamp helpers.
//!
//! Wall-clock timestamps used to tag trade events at decode time so the feed
//! can log receive latency against the exchange timestamp.

use std::time::{SystemTime, UNIX_EPOCH};

#[inline]
fn epoch() -> std::time::Duration {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default()
}

/// Current time as **microseconds** since Unix epoch.
#[inline]
pub fn now_us() -> u64 {
    let d = epoch();
    d.as_secs() * 1_000_000 + u64::from(d.subsec_micros())
}

/// Current time as **milliseconds** since Unix epoch.
#[inline]
pub fn now_ms() -> u64 {
    let d = epoch();
    d.as_secs() * 1_000 + u64::from(d.subsec_millis())
}
