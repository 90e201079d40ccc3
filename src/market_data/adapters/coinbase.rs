// Coinbase Exchange: GET /products/{id}/book?level=2
// {"bids": [["price", "size", num_orders], ...], "asks": [...], "sequence": ...}
// Errors come back as {"message": "..."}.

use serde::Deserialize;
use serde_json::Value;

use super::{collect_side, non_empty, SnapshotParser, Venue, VenueBook};
use crate::error::ParseError;
use crate::market_data::normaliser::level_from_tuple;

#[derive(Debug, Deserialize)]
struct CoinbaseBook {
    bids: Option<Vec<Value>>,
    asks: Option<Vec<Value>>,
    message: Option<String>,
}

pub struct CoinbaseParser;

impl SnapshotParser for CoinbaseParser {
    fn parse(&self, raw: &str) -> Result<VenueBook, ParseError> {
        let book: CoinbaseBook = serde_json::from_str(non_empty(raw)?)?;

        let (bids, asks) = match (book.bids, book.asks, book.message) {
            (Some(bids), Some(asks), _) => (bids, asks),
            (_, _, Some(message)) => return Err(ParseError::VenueError(message)),
            (None, _, None) => return Err(ParseError::MissingField("bids")),
            (_, None, None) => return Err(ParseError::MissingField("asks")),
        };

        let mut skipped = 0;
        let bids = collect_side(&bids, Venue::Coinbase, "bids", &mut skipped, level_from_tuple);
        let asks = collect_side(&asks, Venue::Coinbase, "asks", &mut skipped, level_from_tuple);
        Ok(VenueBook { bids, asks, skipped })
    }
}
