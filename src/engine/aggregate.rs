// Collapse sweep fills into one limit order per venue

use rust_decimal::Decimal;
use tracing::debug;

use crate::engine::types::{Fill, LimitOrder, Side};

/// Summarise `venue`'s fills on `side` as a single limit order.
///
/// The limit price is the least favourable price touched at that venue, so the
/// order would still cross every slice the sweep consumed there.
pub fn aggregate(fills: &[Fill], venue: &str, side: Side) -> LimitOrder {
    let order = fills
        .iter()
        .filter(|f| f.venue == venue && f.side == side)
        .fold(LimitOrder::empty(venue, side), |mut order, fill| {
            order.limit_price = if order.total_size.is_zero() {
                fill.price
            } else {
                side.worse_price(order.limit_price, fill.price)
            };
            order.total_size += fill.quantity;
            order
        });

    if order.total_size > Decimal::ZERO {
        debug!(venue, %side, limit = %order.limit_price, size = %order.total_size, "Aggregated limit order");
    }
    order
}

/// One limit order per venue, in the order given, including zero-size entries.
pub fn routing_plan<'a, I>(fills: &[Fill], venues: I, side: Side) -> Vec<LimitOrder>
where
    I: IntoIterator<Item = &'a str>,
{
    venues
        .into_iter()
        .map(|venue| aggregate(fills, venue, side))
        .collect()
}
