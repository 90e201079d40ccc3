// Convert wire values into decimals and validated price levels.
// Venues disagree on whether numbers are JSON strings or JSON numbers, so both are accepted.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::engine::types::PriceLevel;
use crate::error::LevelError;

/// Parse a decimal string, accepting exponent notation (`1e-3`) as well.
pub fn decimal_from_str(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

pub fn decimal_from_value(value: &Value) -> Result<Decimal, LevelError> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => return Err(LevelError::Shape(format!("expected a number, got {}", other))),
    };
    decimal_from_str(&text).ok_or(LevelError::InvalidDecimal(text))
}

/// Largest price x size a single level may carry. Keeps sweep totals over a
/// whole book far inside `Decimal`'s range.
pub const MAX_LEVEL_NOTIONAL: Decimal = Decimal::from_parts(1_661_992_960, 1_808_227_885, 5, false, 0); // 1e20

/// Build a level from raw price/size values.
///
/// Returns `Ok(None)` for a zero-size level, which is the same as no level.
pub fn level_from_values(
    price: &Value,
    size: &Value,
    venue: &str,
) -> Result<Option<PriceLevel>, LevelError> {
    let price = decimal_from_value(price)?;
    let size = decimal_from_value(size)?;

    if price <= Decimal::ZERO {
        return Err(LevelError::NonPositivePrice(price.to_string()));
    }
    if size < Decimal::ZERO {
        return Err(LevelError::NegativeSize(size.to_string()));
    }
    if size.is_zero() {
        return Ok(None);
    }
    match price.checked_mul(size) {
        Some(notional) if notional <= MAX_LEVEL_NOTIONAL => {}
        _ => {
            return Err(LevelError::OutOfRange {
                price: price.to_string(),
                size: size.to_string(),
            })
        }
    }
    Ok(Some(PriceLevel::new(price, size, venue)))
}

/// `[price, size, ...]` as used by Coinbase and Kraken. Trailing elements are ignored.
pub fn level_from_tuple(entry: &Value, venue: &str) -> Result<Option<PriceLevel>, LevelError> {
    match entry.as_array() {
        Some(items) if items.len() >= 2 => level_from_values(&items[0], &items[1], venue),
        _ => Err(LevelError::Shape(format!("expected [price, size, ...], got {}", entry))),
    }
}
