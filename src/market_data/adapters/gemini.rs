// Gemini: GET /v1/book/{symbol}
// {"bids": [{"price": "...", "amount": "...", "timestamp": "..."}], "asks": [...]}
// Errors: {"result": "error", "reason": "...", "message": "..."}

use serde::Deserialize;
use serde_json::Value;

use super::{collect_side, non_empty, SnapshotParser, Venue, VenueBook};
use crate::engine::types::PriceLevel;
use crate::error::{LevelError, ParseError};
use crate::market_data::normaliser::level_from_values;

#[derive(Debug, Deserialize)]
struct GeminiBook {
    bids: Option<Vec<Value>>,
    asks: Option<Vec<Value>>,
    result: Option<String>,
    reason: Option<String>,
    message: Option<String>,
}

fn level_from_object(entry: &Value, venue: &str) -> Result<Option<PriceLevel>, LevelError> {
    match (entry.get("price"), entry.get("amount")) {
        (Some(price), Some(amount)) => level_from_values(price, amount, venue),
        _ => Err(LevelError::Shape(format!("expected {{price, amount}}, got {}", entry))),
    }
}

pub struct GeminiParser;

impl SnapshotParser for GeminiParser {
    fn parse(&self, raw: &str) -> Result<VenueBook, ParseError> {
        let book: GeminiBook = serde_json::from_str(non_empty(raw)?)?;

        if book.result.as_deref() == Some("error") {
            let detail = book.message.or(book.reason).unwrap_or_else(|| "unknown error".to_string());
            return Err(ParseError::VenueError(detail));
        }
        let bids = book.bids.ok_or(ParseError::MissingField("bids"))?;
        let asks = book.asks.ok_or(ParseError::MissingField("asks"))?;

        let mut skipped = 0;
        let bids = collect_side(&bids, Venue::Gemini, "bids", &mut skipped, level_from_object);
        let asks = collect_side(&asks, Venue::Gemini, "asks", &mut skipped, level_from_object);
        Ok(VenueBook { bids, asks, skipped })
    }
}
