use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::engine::sweep::sweep;
use crate::engine::types::{PriceLevel, Quantity, Side, SweepResult};
use crate::error::SweepError;
use crate::market_data::adapters::VenueBook;

/// Every venue's levels in one place: bids best (highest) first, asks best
/// (lowest) first. Equal prices keep the order their venues were added in.
/// Levels are never combined, so each one stays attributable to its venue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompositeBook {
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
}

impl CompositeBook {
    /// Merge venue books in the order given.
    pub fn from_venues<'a, I>(books: I) -> Self
    where
        I: IntoIterator<Item = &'a VenueBook>,
    {
        let mut builder = CompositeBookBuilder::new();
        for book in books {
            builder.add(book);
        }
        builder.build()
    }

    pub fn bids(&self) -> &[PriceLevel] {
        &self.bids
    }

    pub fn asks(&self) -> &[PriceLevel] {
        &self.asks
    }

    pub fn levels(&self, side: Side) -> &[PriceLevel] {
        // buying lifts asks, selling hits bids
        match side {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        }
    }

    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Total size resting on the side a `side` order would consume, `None` on overflow.
    pub fn depth(&self, side: Side) -> Option<Decimal> {
        self.levels(side)
            .iter()
            .try_fold(Decimal::ZERO, |acc, l| acc.checked_add(l.size))
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Cost of buying `quantity` against the asks.
    pub fn sweep_buy(&self, quantity: Quantity) -> Result<SweepResult, SweepError> {
        sweep(&self.asks, quantity, Side::Buy)
    }

    /// Proceeds of selling `quantity` into the bids.
    pub fn sweep_sell(&self, quantity: Quantity) -> Result<SweepResult, SweepError> {
        sweep(&self.bids, quantity, Side::Sell)
    }
}

/// Accumulates venue levels unsorted; ordering happens once in [`build`](Self::build).
#[derive(Debug, Default)]
pub struct CompositeBookBuilder {
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
}

impl CompositeBookBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, book: &VenueBook) -> &mut Self {
        self.bids.extend_from_slice(&book.bids);
        self.asks.extend_from_slice(&book.asks);
        self
    }

    #[instrument(level = "debug", skip(self), fields(bids = self.bids.len(), asks = self.asks.len()))]
    pub fn build(self) -> CompositeBook {
        let CompositeBookBuilder { mut bids, mut asks } = self;
        // sort_by is stable: ties stay in insertion (venue) order
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));

        debug!(
            best_bid = ?bids.first().map(|l| l.price),
            best_ask = ?asks.first().map(|l| l.price),
            "Composite book built"
        );
        CompositeBook { bids, asks }
    }
}
