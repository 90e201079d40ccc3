use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::QuantityError;
use crate::market_data::normaliser::decimal_from_str;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The price less favourable to the trader: the higher one when buying,
    /// the lower one when selling.
    pub fn worse_price(self, a: Decimal, b: Decimal) -> Decimal {
        match self {
            Side::Buy => a.max(b),
            Side::Sell => a.min(b),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "Buy"),
            Side::Sell => write!(f, "Sell"),
        }
    }
}

// Resting liquidity at one price on one venue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
    pub venue: String,
}

impl PriceLevel {
    pub fn new(price: Decimal, size: Decimal, venue: impl Into<String>) -> Self {
        Self { price, size, venue: venue.into() }
    }

    /// `None` when price x size leaves `Decimal`'s range.
    pub fn notional(&self) -> Option<Decimal> {
        self.price.checked_mul(self.size)
    }
}

/// A non-negative amount of the base asset to sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    pub const ZERO: Quantity = Quantity(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self, QuantityError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(QuantityError::Negative(value.to_string()));
        }
        Ok(Self(value))
    }

    /// Parse a user-supplied order size. Zero is rejected here because there
    /// is nothing to price.
    pub fn parse_order_size(input: &str) -> Result<Self, QuantityError> {
        let trimmed = input.trim();
        let value = decimal_from_str(trimmed)
            .ok_or_else(|| QuantityError::NotANumber(trimmed.to_string()))?;
        let quantity = Self::new(value)?;
        if quantity.0.is_zero() {
            return Err(QuantityError::NotPositive(trimmed.to_string()));
        }
        Ok(quantity)
    }

    pub fn value(self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

// One slice of a level consumed during a sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fill {
    pub venue: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
}

impl Fill {
    pub fn notional(&self) -> Option<Decimal> {
        self.price.checked_mul(self.quantity)
    }
}

/// Outcome of walking one side of the composite book.
///
/// `total_value` only prices the whole request when `shortfall` is zero.
/// Callers must check [`SweepResult::is_complete`] (or use
/// [`SweepResult::total_if_complete`]) before reporting it as a cost or proceeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepResult {
    pub side: Side,
    pub requested: Decimal,
    pub total_value: Decimal,
    pub fills: Vec<Fill>,
    pub shortfall: Decimal,
}

impl SweepResult {
    // Fills never add up to more than `requested`, so this cannot overflow
    pub fn filled_quantity(&self) -> Decimal {
        self.fills.iter().map(|f| f.quantity).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.shortfall.is_zero()
    }

    pub fn total_if_complete(&self) -> Option<Decimal> {
        self.is_complete().then_some(self.total_value)
    }

    /// Volume-weighted price per unit of the full request.
    pub fn average_price(&self) -> Option<Decimal> {
        if !self.is_complete() || self.requested.is_zero() {
            return None;
        }
        self.total_value.checked_div(self.requested)
    }
}

/// Per-venue routing instruction derived from a sweep's fills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LimitOrder {
    pub venue: String,
    pub side: Side,
    pub limit_price: Decimal,
    pub total_size: Decimal,
}

impl LimitOrder {
    pub fn empty(venue: impl Into<String>, side: Side) -> Self {
        Self {
            venue: venue.into(),
            side,
            limit_price: Decimal::ZERO,
            total_size: Decimal::ZERO,
        }
    }

    /// A zero-size order means the venue contributed nothing; there is nothing to submit.
    pub fn is_actionable(&self) -> bool {
        self.total_size > Decimal::ZERO
    }
}
