//! Downstream sink seam.
//!
//! The bridge writes wire records through these traits; reconnection is the
//! bridge's job, so the connector stays around for the whole run and can be
//! asked for a fresh sink after a write failure. The production
//! implementation is a TCP connection in `tick-bridge`.

use async_trait::async_trait;

use crate::error::BridgeError;

/// A one-way, best-effort record writer. No handshake, no acknowledgment.
#[async_trait]
pub trait RecordSink: Send {
    /// Write one complete newline-terminated record.
    ///
    /// Either the whole record is handed to the transport or an error is
    /// returned — partial records are never written.
    async fn send_record(&mut self, line: &str) -> Result<(), BridgeError>;

    /// Release the connection. Idempotent.
    async fn shutdown(&mut self);
}

/// Opens a [`RecordSink`] to the downstream peer.
#[async_trait]
pub trait SinkConnector: Send {
    type Sink: RecordSink;

    /// Establish a fresh connection. Fails with
    /// [`BridgeError::DownstreamUnavailable`] if the peer refuses.
    async fn connect(&self) -> Result<Self::Sink, BridgeError>;
}
