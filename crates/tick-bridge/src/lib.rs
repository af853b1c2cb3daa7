//! # tick-bridge
//!
//! The forwarding bridge: owns a single persistent downstream connection,
//! consumes the upstream trade sequence, encodes each event to the CSV wire
//! format, and applies the bounded reconnect policy on write failure.
//!
//! - [`state`] — explicit state machine enum + per-run connection bookkeeping
//! - [`tcp`] — production TCP record sink
//! - [`bridge`] — the forwarding loop itself

pub mod bridge;
pub mod state;
pub mod tcp;

pub use bridge::ForwardingBridge;
pub use state::BridgeState;
pub use tcp::{TcpConnector, TcpRecordSink};
