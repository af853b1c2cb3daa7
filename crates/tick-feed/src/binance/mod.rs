//! Binance trade subscription.
//!
//! [`TradeSubscription`] owns one WebSocket connection to a public trade
//! channel (TLS, anonymous — trade streams need no credentials) and yields
//! decoded trades one at a time:
//!
//! 1. Connects to the exchange WebSocket endpoint.
//! 2. Sends the `SUBSCRIBE` message for `<symbol>@trade`.
//! 3. Pulls frames on demand, answering protocol pings and skipping
//!    everything that is not a complete trade payload.
//!
//! There is no reconnect here: the sequence is not restartable, and a
//! dropped subscription surfaces as end-of-stream to the bridge.

pub mod json_parser;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tick_core::error::BridgeError;
use tick_core::feed::{FeedConnector, TradeFeed};
use tick_core::{TradeEvent, time_util};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// One live subscription to a symbol's trade channel.
pub struct TradeSubscription {
    symbol: String,
    ws: Option<WsStream>,
}

impl TradeSubscription {
    /// Connect and subscribe. Fails with [`BridgeError::UpstreamUnavailable`]
    /// if the session cannot be created.
    pub async fn open(ws_url: &str, symbol: &str) -> Result<Self, BridgeError> {
        info!("connecting to upstream feed at {ws_url}");

        let mut ws = connect_ws(ws_url)
            .await
            .map_err(|e| BridgeError::UpstreamUnavailable(format!("{ws_url}: {e}")))?;

        let sub_msg = json_parser::build_trade_subscribe(symbol);
        debug!("subscribing: {sub_msg}");
        ws.send(Message::Text(sub_msg.into()))
            .await
            .map_err(|e| BridgeError::UpstreamUnavailable(format!("subscribe failed: {e}")))?;

        info!("subscribed to {}@trade", symbol.to_lowercase());
        Ok(Self { symbol: symbol.to_uppercase(), ws: Some(ws) })
    }

    /// The upper-cased symbol this subscription covers.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

#[async_trait]
impl TradeFeed for TradeSubscription {
    async fn next(&mut self) -> Option<TradeEvent> {
        let ws = self.ws.as_mut()?;

        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    if let Some(event) = json_parser::decode_frame(&text) {
                        debug!(
                            trade_id = event.trade_id,
                            feed_latency_ms =
                                time_util::now_ms().saturating_sub(event.exchange_time_ms),
                            "trade received"
                        );
                        return Some(event);
                    }
                    // Skipped frame — keep waiting for the next trade.
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = ws.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) => {
                    warn!("[{}] upstream sent close frame", self.symbol);
                    return None;
                }
                Some(Ok(_)) => {} // Binary, Pong, Frame — ignore
                Some(Err(e)) => {
                    error!("[{}] upstream read error: {e}", self.symbol);
                    return None;
                }
                None => {
                    warn!("[{}] upstream stream ended", self.symbol);
                    return None;
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut ws) = self.ws.take() {
            let _ = ws.close(None).await;
            info!("[{}] upstream subscription released", self.symbol);
        }
    }
}

/// Opens [`TradeSubscription`]s for one endpoint + symbol pair.
pub struct BinanceFeedConnector {
    pub ws_url: String,
    pub symbol: String,
}

#[async_trait]
impl FeedConnector for BinanceFeedConnector {
    type Feed = TradeSubscription;

    async fn open(&self) -> Result<TradeSubscription, BridgeError> {
        TradeSubscription::open(&self.ws_url, &self.symbol).await
    }
}

/// Establish a TLS WebSocket connection with an explicit Host header.
async fn connect_ws(url: &str) -> Result<WsStream, tokio_tungstenite::tungstenite::Error> {
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;
    use tokio_tungstenite::tungstenite::http::header::HOST;

    let mut request = url.into_client_request()?;
    let host = extract_host(url);
    if !host.is_empty()
        && let Ok(value) = host.parse()
    {
        request.headers_mut().insert(HOST, value);
    }

    let (stream, _response) = tokio_tungstenite::connect_async(request).await?;
    Ok(stream)
}

/// Extract the host from a URL string.
fn extract_host(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.host_str().unwrap_or("").to_string())
        .unwrap_or_default()
}
