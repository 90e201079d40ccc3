// Kraken: GET /0/public/Depth?pair={pair}
// {"error": [], "result": {"XXBTZUSD": {"asks": [["price", "volume", ts]], "bids": [...]}}}
// The result is keyed by Kraken's own pair name, which rarely matches the request.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use super::{collect_side, non_empty, SnapshotParser, Venue, VenueBook};
use crate::error::ParseError;
use crate::market_data::normaliser::level_from_tuple;

#[derive(Debug, Deserialize)]
struct KrakenResponse {
    #[serde(default)]
    error: Vec<String>,
    result: Option<BTreeMap<String, KrakenBook>>,
}

#[derive(Debug, Deserialize)]
struct KrakenBook {
    bids: Option<Vec<Value>>,
    asks: Option<Vec<Value>>,
}

pub struct KrakenParser;

impl SnapshotParser for KrakenParser {
    fn parse(&self, raw: &str) -> Result<VenueBook, ParseError> {
        let response: KrakenResponse = serde_json::from_str(non_empty(raw)?)?;

        if !response.error.is_empty() {
            return Err(ParseError::VenueError(response.error.join("; ")));
        }
        let result = response.result.ok_or(ParseError::MissingField("result"))?;
        // single pair requested; take the first (and only) entry
        let book = result.into_values().next().ok_or(ParseError::EmptyResult)?;

        let bids = book.bids.ok_or(ParseError::MissingField("bids"))?;
        let asks = book.asks.ok_or(ParseError::MissingField("asks"))?;

        let mut skipped = 0;
        let bids = collect_side(&bids, Venue::Kraken, "bids", &mut skipped, level_from_tuple);
        let asks = collect_side(&asks, Venue::Kraken, "asks", &mut skipped, level_from_tuple);
        Ok(VenueBook { bids, asks, skipped })
    }
}
