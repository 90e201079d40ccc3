// Cross-venue order book aggregation: fetch level-2 snapshots, merge them into one
// composite book, sweep it for a market order, and fold the fills into per-venue limit orders.

pub mod config;
pub mod engine;
pub mod error;
pub mod market_data;
pub mod telemetry;

pub use crate::config::{AggregatorConfig, VenueConfig};
pub use engine::{aggregate, routing_plan, sweep, Fill, LimitOrder, PriceLevel, Quantity, Side, SweepResult};
pub use error::{ConfigError, FetchError, LevelError, ParseError, QuantityError, SweepError};
pub use market_data::adapters::{SnapshotParser, Venue, VenueBook};
pub use market_data::composite_book::{CompositeBook, CompositeBookBuilder};
pub use market_data::fetch::{HttpFetcher, SnapshotFetcher};
pub use market_data::router::{run_query, QueryReport, SideSummary, VenueStatus};
