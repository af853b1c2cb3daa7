//! Bridge state machine types.
//!
//! The reconnect policy is modeled as an explicit enum rather than nested
//! branches so its terminal/retry boundary is independently testable.

use std::fmt;

/// States of the forwarding state machine.
///
/// ```text
/// Idle ─► ConnectingDownstream ─► ConnectingUpstream ─► Streaming
///             │ failure                │ failure          │ write failure
///             ▼                        ▼                  ▼
///           Failed                   Failed       ReconnectingDownstream
///                                                    │ success: ─► Streaming
///                                                    │ failure: ─► Failed
/// any state ─► (shutdown signal) ─► ShuttingDown ─► Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Idle,
    ConnectingDownstream,
    ConnectingUpstream,
    Streaming,
    ReconnectingDownstream,
    ShuttingDown,
    /// Terminal: the run ended with a reported failure, resources released.
    Failed,
    /// Terminal: cooperative shutdown completed, resources released.
    Stopped,
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BridgeState::Idle => "idle",
            BridgeState::ConnectingDownstream => "connecting-downstream",
            BridgeState::ConnectingUpstream => "connecting-upstream",
            BridgeState::Streaming => "streaming",
            BridgeState::ReconnectingDownstream => "reconnecting-downstream",
            BridgeState::ShuttingDown => "shutting-down",
            BridgeState::Failed => "failed",
            BridgeState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

impl BridgeState {
    /// Whether this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BridgeState::Failed | BridgeState::Stopped)
    }
}

/// Downstream connection bookkeeping for one bridge run.
///
/// Process-local; reset to empty on every start. No crash-recovery of
/// counters is required.
pub struct ConnectionState<S> {
    /// Current downstream sink, if connected. Replaced atomically (from the
    /// perspective of `forward`) during a reconnect — no write is ever
    /// attempted against a sink known to be failed.
    pub sink: Option<S>,
    /// Records written successfully since the run started.
    pub forwarded: u64,
    /// Reconnect attempts spent since the run started.
    pub reconnects: u64,
}

impl<S> ConnectionState<S> {
    pub fn new(sink: S) -> Self {
        Self { sink: Some(sink), forwarded: 0, reconnects: 0 }
    }
}
