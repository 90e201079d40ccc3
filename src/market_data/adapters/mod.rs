// Venue registry + shared parser plumbing

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::engine::types::PriceLevel;
use crate::error::{LevelError, ParseError};

pub mod coinbase;
pub mod gemini;
pub mod kraken;

/// One venue's snapshot translated into unordered price levels.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VenueBook {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    /// Levels dropped because they could not be converted.
    pub skipped: usize,
}

impl VenueBook {
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

/// Turns a venue's raw snapshot body into levels. No sorting, no filtering
/// beyond dropping levels that are absent (zero size) or malformed.
pub trait SnapshotParser {
    fn parse(&self, raw: &str) -> Result<VenueBook, ParseError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Coinbase,
    Gemini,
    Kraken,
}

impl Venue {
    pub const ALL: [Venue; 3] = [Venue::Coinbase, Venue::Gemini, Venue::Kraken];

    pub fn name(self) -> &'static str {
        match self {
            Venue::Coinbase => "Coinbase",
            Venue::Gemini => "Gemini",
            Venue::Kraken => "Kraken",
        }
    }

    /// Public level-2 snapshot endpoint for `base`/`quote` (e.g. BTC/USD).
    pub fn snapshot_url(self, base: &str, quote: &str) -> String {
        let base = base.to_uppercase();
        let quote = quote.to_uppercase();
        match self {
            Venue::Coinbase => format!(
                "https://api.exchange.coinbase.com/products/{}-{}/book?level=2",
                base, quote
            ),
            Venue::Gemini => format!("https://api.gemini.com/v1/book/{}{}", base, quote),
            Venue::Kraken => format!("https://api.kraken.com/0/public/Depth?pair={}{}", base, quote),
        }
    }

    pub fn parse(self, raw: &str) -> Result<VenueBook, ParseError> {
        match self {
            Venue::Coinbase => coinbase::CoinbaseParser.parse(raw),
            Venue::Gemini => gemini::GeminiParser.parse(raw),
            Venue::Kraken => kraken::KrakenParser.parse(raw),
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Venue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coinbase" => Ok(Venue::Coinbase),
            "gemini" => Ok(Venue::Gemini),
            "kraken" => Ok(Venue::Kraken),
            other => Err(format!(
                "unknown venue `{}` (expected one of: coinbase, gemini, kraken)",
                other
            )),
        }
    }
}

/// Reject bodies that carry nothing before handing them to serde.
pub(crate) fn non_empty(raw: &str) -> Result<&str, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(ParseError::Empty)
    } else {
        Ok(trimmed)
    }
}

/// Convert one side's raw entries, skipping any level that fails on its own.
pub(crate) fn collect_side<F>(
    entries: &[Value],
    venue: Venue,
    side: &'static str,
    skipped: &mut usize,
    convert: F,
) -> Vec<PriceLevel>
where
    F: Fn(&Value, &str) -> Result<Option<PriceLevel>, LevelError>,
{
    let mut levels = Vec::with_capacity(entries.len());
    for entry in entries {
        match convert(entry, venue.name()) {
            Ok(Some(level)) => levels.push(level),
            Ok(None) => {}
            Err(e) => {
                *skipped += 1;
                debug!(%venue, side, error = %e, "Skipping malformed level");
            }
        }
    }
    levels
}
