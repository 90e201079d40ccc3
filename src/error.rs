// Error types shared across the crate.
// FetchError/ParseError become an unavailable venue; QuantityError and ConfigError stop the run before any fetch.

use thiserror::Error;

use crate::engine::types::Side;

/// Failure to retrieve a raw snapshot from a venue.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// A venue response whose top-level schema could not be understood.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty response body")]
    Empty,

    #[error("malformed JSON: {0}")]
    Json(String),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("venue reported errors: {0}")]
    VenueError(String),

    #[error("venue returned an empty result set")]
    EmptyResult,
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        ParseError::Json(err.to_string())
    }
}

/// A single price level that could not be converted. Only the level is dropped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LevelError {
    #[error("unexpected level shape: {0}")]
    Shape(String),

    #[error("invalid decimal `{0}`")]
    InvalidDecimal(String),

    #[error("non-positive price {0}")]
    NonPositivePrice(String),

    #[error("negative size {0}")]
    NegativeSize(String),

    #[error("level notional {price} x {size} is out of range")]
    OutOfRange { price: String, size: String },
}

/// Arithmetic on one side of the book left `Decimal`'s range.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SweepError {
    #[error("{side} sweep overflowed at price {price}")]
    Overflow { side: Side, price: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuantityError {
    #[error("quantity `{0}` is not a number")]
    NotANumber(String),

    #[error("quantity must not be negative, got {0}")]
    Negative(String),

    #[error("quantity must be greater than zero, got {0}")]
    NotPositive(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("no venues configured")]
    NoVenues,

    #[error("fetch timeout must be greater than zero")]
    InvalidTimeout,
}
