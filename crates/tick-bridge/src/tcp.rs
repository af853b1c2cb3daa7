//! TCP record sink — the production downstream transport.
//!
//! A plain stream-oriented connection over which newline-terminated records
//! are pushed one-way, best-effort. No handshake, no framing length, no
//! acknowledgment. Connection refusal and mid-stream write failure map to
//! distinct error variants so the logs can tell them apart.

use async_trait::async_trait;
use tick_core::error::BridgeError;
use tick_core::sink::{RecordSink, SinkConnector};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::info;

/// One established downstream connection.
#[derive(Debug)]
pub struct TcpRecordSink {
    stream: Option<TcpStream>,
    peer: String,
}

#[async_trait]
impl RecordSink for TcpRecordSink {
    async fn send_record(&mut self, line: &str) -> Result<(), BridgeError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| BridgeError::DownstreamWriteFailed("connection released".into()))?;

        stream
            .write_all(line.as_bytes())
            .await
            .map_err(|e| BridgeError::DownstreamWriteFailed(format!("{}: {e}", self.peer)))
    }

    async fn shutdown(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
            info!("downstream connection to {} released", self.peer);
        }
    }
}

/// Opens [`TcpRecordSink`]s to one downstream address.
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: String) -> Self {
        Self { addr }
    }
}

#[async_trait]
impl SinkConnector for TcpConnector {
    type Sink = TcpRecordSink;

    async fn connect(&self) -> Result<TcpRecordSink, BridgeError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| BridgeError::DownstreamUnavailable(format!("{}: {e}", self.addr)))?;

        info!("connected to downstream engine at {}", self.addr);
        Ok(TcpRecordSink { stream: Some(stream), peer: self.addr.clone() })
    }
}
