//! Binance trade-stream JSON decoding.
//!
//! The `<symbol>@trade` channel interleaves trade payloads with subscription
//! acks and other control frames. Decoding is defensive: anything that is not
//! a structurally complete trade message is skipped, never propagated as an
//! error. Uses `serde_json` for parsing and `fast-float2` for
//! string-to-f64 conversion of the decimal fields.

use tick_core::{TradeEvent, time_util};
use tracing::{debug, warn};

/// Build the SUBSCRIBE request for one symbol's trade channel.
pub fn build_trade_subscribe(symbol: &str) -> String {
    serde_json::json!({
        "method": "SUBSCRIBE",
        "params": [format!("{}@trade", symbol.to_lowercase())],
        "id": 1
    })
    .to_string()
}

/// Decode one text frame into a [`TradeEvent`].
///
/// Returns `None` for non-trade frames (logged at debug) and for trade
/// frames with a required field structurally absent (logged at warn).
/// Additional undocumented fields and field ordering are tolerated.
pub fn decode_frame(text: &str) -> Option<TradeEvent> {
    let Ok(v) = serde_json::from_str::<serde_json::Value>(text) else {
        debug!("skipping non-JSON frame");
        return None;
    };

    match v.get("e").and_then(|e| e.as_str()) {
        Some("trade") => match parse_trade(&v) {
            Some(ev) => Some(ev),
            None => {
                warn!("skipping malformed trade frame: {text}");
                None
            }
        },
        _ => {
            // Subscription acks, control frames etc. — not observable upstream.
            debug!("skipping non-trade frame");
            None
        }
    }
}

fn parse_trade(v: &serde_json::Value) -> Option<TradeEvent> {
    let local_time_us = time_util::now_us();

    Some(TradeEvent {
        exchange_time_ms: v.get("E")?.as_u64()?,
        symbol: v.get("s")?.as_str()?.to_uppercase(),
        trade_id: v.get("t")?.as_u64()?,
        price: parse_f64_field(v, "p")?,
        quantity: parse_f64_field(v, "q")?,
        local_time_us,
    })
}

/// Parse a named field as `f64`, accepting the exchange pattern where the
/// value may be either a JSON string (`"30000.5"`) or a native number.
#[inline]
fn parse_f64_field(v: &serde_json::Value, key: &str) -> Option<f64> {
    let v = v.get(key)?;
    if let Some(s) = v.as_str() {
        fast_float2::parse(s).ok()
    } else {
        v.as_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRADE: &str = r#"{"e":"trade","E":1672515782136,"s":"BTCUSDT","t":88,"p":"16500.50","q":"0.001","T":1672515782134,"m":true,"M":true}"#;

    #[test]
    fn decode_trade_frame() {
        let ev = decode_frame(TRADE).unwrap();
        assert_eq!(ev.exchange_time_ms, 1672515782136);
        assert_eq!(ev.symbol, "BTCUSDT");
        assert_eq!(ev.trade_id, 88);
        assert!((ev.price - 16500.50).abs() < 1e-9);
        assert!((ev.quantity - 0.001).abs() < 1e-12);
        assert!(ev.local_time_us > 0);
    }

    #[test]
    fn lowercase_symbol_normalized() {
        let json = r#"{"e":"trade","E":1000,"s":"btcusdt","t":1,"p":"1.0","q":"2.0"}"#;
        let ev = decode_frame(json).unwrap();
        assert_eq!(ev.symbol, "BTCUSDT");
    }

    #[test]
    fn extra_fields_tolerated() {
        let json = r#"{"e":"trade","E":1000,"s":"BTCUSDT","t":1,"p":"1.0","q":"2.0","x":"future-proofing","yy":[1,2]}"#;
        assert!(decode_frame(json).is_some());
    }

    #[test]
    fn numeric_price_tolerated() {
        let json = r#"{"e":"trade","E":1000,"s":"BTCUSDT","t":1,"p":1.5,"q":2.5}"#;
        let ev = decode_frame(json).unwrap();
        assert!((ev.price - 1.5).abs() < 1e-12);
    }

    #[test]
    fn non_trade_frame_skipped() {
        assert!(decode_frame(r#"{"result":null,"id":1}"#).is_none());
        assert!(decode_frame(r#"{"e":"aggTrade","E":1000,"s":"BTCUSDT"}"#).is_none());
    }

    #[test]
    fn malformed_trade_frames_skipped() {
        // Missing price.
        assert!(decode_frame(r#"{"e":"trade","E":1000,"s":"BTCUSDT","t":1,"q":"2.0"}"#).is_none());
        // Missing quantity.
        assert!(decode_frame(r#"{"e":"trade","E":1000,"s":"BTCUSDT","t":1,"p":"1.0"}"#).is_none());
        // Missing trade id.
        assert!(decode_frame(r#"{"e":"trade","E":1000,"s":"BTCUSDT","p":"1.0","q":"2.0"}"#).is_none());
        // Not JSON at all.
        assert!(decode_frame("not json").is_none());
    }

    #[test]
    fn subscribe_message_shape() {
        let msg = build_trade_subscribe("BTCUSDT");
        let v: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(v["method"], "SUBSCRIBE");
        assert_eq!(v["params"][0], "btcusdt@trade");
        assert_eq!(v["id"], 1);
    }
}
