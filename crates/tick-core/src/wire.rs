//! Downstream wire codec.
//!
//! One trade event maps to one UTF-8 text line:
//!
//! ```text
//! exchange_time_ms,SYMBOL,trade_id,open,high,low,close,volume\n
//! ```
//!
//! Because each record originates from a single executed trade (not an
//! aggregated candle), `open = high = low = close = price`. This lets the
//! downstream engine reuse one record shape for both tick-level and
//! aggregated data. Decimal fields carry exactly 8 fractional digits and the
//! symbol is upper-cased. No escaping is defined: the symbol must not
//! contain commas (format constraint, not validated here).

use crate::error::BridgeError;
use crate::types::TradeEvent;

/// Number of comma-separated fields in a wire record.
pub const WIRE_FIELD_COUNT: usize = 8;

/// Encode one trade event as a newline-terminated wire record.
pub fn encode_record(event: &TradeEvent) -> String {
    format!(
        "{},{},{},{p:.8},{p:.8},{p:.8},{p:.8},{q:.8}\n",
        event.exchange_time_ms,
        event.symbol.to_uppercase(),
        event.trade_id,
        p = event.price,
        q = event.quantity,
    )
}

/// Decode a wire record back into a [`TradeEvent`].
///
/// The inverse of [`encode_record`], used for diagnostics and tests — the
/// bridge itself never reads from the downstream connection. `price` is
/// taken from the `close` field; `local_time_us` is not on the wire and
/// comes back as 0.
pub fn decode_record(line: &str) -> Result<TradeEvent, BridgeError> {
    let line = line
        .strip_suffix('\n')
        .ok_or_else(|| BridgeError::Parse("record missing trailing newline".into()))?;

    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != WIRE_FIELD_COUNT {
        return Err(BridgeError::Parse(format!(
            "expected {WIRE_FIELD_COUNT} fields, got {}",
            fields.len()
        )));
    }

    let exchange_time_ms: u64 = fields[0]
        .parse()
        .map_err(|e| BridgeError::Parse(format!("bad timestamp '{}': {e}", fields[0])))?;
    let trade_id: u64 = fields[2]
        .parse()
        .map_err(|e| BridgeError::Parse(format!("bad trade id '{}': {e}", fields[2])))?;
    let price: f64 = fields[6]
        .parse()
        .map_err(|e| BridgeError::Parse(format!("bad close '{}': {e}", fields[6])))?;
    let quantity: f64 = fields[7]
        .parse()
        .map_err(|e| BridgeError::Parse(format!("bad volume '{}': {e}", fields[7])))?;

    Ok(TradeEvent {
        exchange_time_ms,
        symbol: fields[1].to_uppercase(),
        trade_id,
        price,
        quantity,
        local_time_us: 0,
    })
}
