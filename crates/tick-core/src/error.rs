//! Typed error definitions for the tickbridge system.
//!
//! Provides [`BridgeError`] for domain-specific errors that are more
//! informative than plain `anyhow::Error` strings. All variants implement
//! `std::error::Error` via `thiserror`, so they integrate seamlessly with
//! `anyhow::Result` at the binary boundary.
//!
//! Cooperative shutdown is *not* an error and has no variant here: a run that
//! is asked to stop returns `Ok`.

use thiserror::Error;

/// Domain-specific errors for the tickbridge system.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// The upstream feed subscription cannot be opened or re-opened.
    /// Fatal to the run — no upstream retry is defined.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The initial connect to the downstream peer failed (e.g. refused).
    /// Fatal — the run never reaches streaming.
    #[error("downstream unavailable: {0}")]
    DownstreamUnavailable(String),

    /// A write to an established downstream connection failed. Recovered via
    /// exactly one reconnect attempt; escalates to fatal if that also fails.
    #[error("downstream write failed: {0}")]
    DownstreamWriteFailed(String),

    /// A wire record could not be decoded (diagnostics / test tooling only —
    /// malformed upstream frames are absorbed inside the feed, not here).
    #[error("wire parse error: {0}")]
    Parse(String),
}
