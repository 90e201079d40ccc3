// Liquidity sweep: price a quantity against depth already ordered best-price-first
use rust_decimal::Decimal;
use tracing::{debug, error, instrument, trace, warn};

use crate::engine::types::{Fill, PriceLevel, Quantity, Side, SweepResult};
use crate::error::SweepError;

/// Walk `levels` in order, consuming up to `quantity`.
///
/// Every level touched emits one [`Fill`] tagged with `side`. If the levels run
/// out first, the unfilled remainder is reported as `shortfall` and the
/// accumulated `total_value` covers only what was filled.
///
/// Fails with [`SweepError::Overflow`] instead of panicking when the running
/// total leaves `Decimal`'s range.
#[instrument(level = "debug", skip(levels, quantity), fields(levels = levels.len(), requested = %quantity))]
pub fn sweep(levels: &[PriceLevel], quantity: Quantity, side: Side) -> Result<SweepResult, SweepError> {
    let requested = quantity.value();
    let mut remaining = requested;
    let mut total_value = Decimal::ZERO;
    let mut fills = Vec::new();

    for level in levels {
        if remaining.is_zero() {
            break;
        }
        let fill_qty = level.size.min(remaining);
        if fill_qty <= Decimal::ZERO {
            continue;
        }

        total_value = match fill_qty
            .checked_mul(level.price)
            .and_then(|value| total_value.checked_add(value))
        {
            Some(total) => total,
            None => {
                error!(venue = %level.venue, price = %level.price, qty = %fill_qty, "Sweep total overflowed");
                metrics::counter!("lobx_sweep_overflow_total", "side" => side.to_string()).increment(1);
                return Err(SweepError::Overflow { side, price: level.price.to_string() });
            }
        };
        remaining -= fill_qty;
        trace!(venue = %level.venue, price = %level.price, qty = %fill_qty, "Level consumed");

        fills.push(Fill {
            venue: level.venue.clone(),
            side,
            price: level.price,
            quantity: fill_qty,
        });
    }

    if remaining > Decimal::ZERO {
        warn!(
            %side,
            requested = %requested,
            shortfall = %remaining,
            "Not enough liquidity to fulfil the order"
        );
        metrics::counter!("lobx_sweep_shortfall_total", "side" => side.to_string()).increment(1);
    } else {
        debug!(%side, fills = fills.len(), total = %total_value, "Sweep complete");
    }

    Ok(SweepResult {
        side,
        requested,
        total_value,
        fills,
        shortfall: remaining,
    })
}
