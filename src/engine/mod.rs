// Pricing core: level types, the liquidity sweep, and fill aggregation
pub mod types;
pub mod sweep;
pub mod aggregate;

pub use aggregate::{aggregate, routing_plan};
pub use sweep::sweep;
pub use types::*;
