// Router orchestrates fetch -> parse -> merge -> sweep -> aggregate for one query
use std::time::{Duration, Instant};

use futures::future::join_all;
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::config::{AggregatorConfig, VenueConfig};
use crate::engine::aggregate::routing_plan;
use crate::engine::types::{Fill, LimitOrder, PriceLevel, Quantity, Side, SweepResult};
use crate::error::{FetchError, SweepError};
use crate::market_data::adapters::{Venue, VenueBook};
use crate::market_data::composite_book::CompositeBook;
use crate::market_data::fetch::SnapshotFetcher;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VenueStatus {
    Available {
        venue: Venue,
        bids: usize,
        asks: usize,
        skipped: usize,
    },
    Unavailable {
        venue: Venue,
        reason: String,
    },
}

impl VenueStatus {
    pub fn venue(&self) -> Venue {
        match self {
            VenueStatus::Available { venue, .. } | VenueStatus::Unavailable { venue, .. } => *venue,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, VenueStatus::Available { .. })
    }
}

/// One venue's contribution: its levels (empty when unavailable) and what happened.
#[derive(Debug, Clone)]
pub struct VenueLoad {
    pub book: VenueBook,
    pub status: VenueStatus,
}

impl VenueLoad {
    fn unavailable(venue: Venue, stage: &'static str, reason: String) -> Self {
        metrics::counter!("lobx_venue_unavailable_total", "venue" => venue.name(), "reason" => stage)
            .increment(1);
        Self {
            book: VenueBook::default(),
            status: VenueStatus::Unavailable { venue, reason },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SideSummary {
    pub side: Side,
    pub total_value: Decimal,
    pub shortfall: Decimal,
    pub average_price: Option<Decimal>,
    /// Set when the side could not be priced at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SideSummary {
    /// A side that could not be priced: nothing counts as filled.
    pub fn failed(side: Side, quantity: Quantity, err: &SweepError) -> Self {
        Self {
            side,
            total_value: Decimal::ZERO,
            shortfall: quantity.value(),
            average_price: None,
            error: Some(err.to_string()),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.shortfall.is_zero()
    }
}

impl From<&SweepResult> for SideSummary {
    fn from(result: &SweepResult) -> Self {
        Self {
            side: result.side,
            total_value: result.total_value,
            shortfall: result.shortfall,
            average_price: result.average_price(),
            error: None,
        }
    }
}

// Split a sweep outcome into its report summary and fills
fn summarise(
    side: Side,
    quantity: Quantity,
    result: Result<SweepResult, SweepError>,
) -> (SideSummary, Vec<Fill>) {
    match result {
        Ok(sweep) => (SideSummary::from(&sweep), sweep.fills),
        Err(e) => {
            warn!(%side, error = %e, "Side could not be priced");
            (SideSummary::failed(side, quantity, &e), Vec::new())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryReport {
    pub base: String,
    pub quote: String,
    pub quantity: Quantity,
    pub buy: SideSummary,
    pub sell: SideSummary,
    pub buy_fills: Vec<Fill>,
    pub sell_fills: Vec<Fill>,
    /// Per configured venue: Buy then Sell, zero-size entries included.
    pub routing_plan: Vec<LimitOrder>,
    pub venues: Vec<VenueStatus>,
    pub best_bid: Option<PriceLevel>,
    pub best_ask: Option<PriceLevel>,
}

impl QueryReport {
    /// Price `quantity` both ways against an already merged book.
    pub fn from_book(
        config: &AggregatorConfig,
        quantity: Quantity,
        book: &CompositeBook,
        venues: Vec<VenueStatus>,
    ) -> Self {
        let (buy, buy_fills) = summarise(Side::Buy, quantity, book.sweep_buy(quantity));
        let (sell, sell_fills) = summarise(Side::Sell, quantity, book.sweep_sell(quantity));

        let names: Vec<&str> = config.venues.iter().map(|v| v.venue.name()).collect();
        let plan = routing_plan(&buy_fills, names.iter().copied(), Side::Buy)
            .into_iter()
            .interleave(routing_plan(&sell_fills, names.iter().copied(), Side::Sell))
            .collect();

        Self {
            base: config.base.clone(),
            quote: config.quote.clone(),
            quantity,
            buy,
            sell,
            buy_fills,
            sell_fills,
            routing_plan: plan,
            venues,
            best_bid: book.best_bid().cloned(),
            best_ask: book.best_ask().cloned(),
        }
    }

    pub fn limit_orders(&self, side: Side) -> impl Iterator<Item = &LimitOrder> {
        self.routing_plan.iter().filter(move |o| o.side == side)
    }
}

/// Fetch and parse one venue. Never fails: problems become `VenueStatus::Unavailable`.
#[instrument(skip(fetcher, config, base, quote, timeout), fields(venue = %config.venue))]
pub async fn load_venue<F>(
    fetcher: &F,
    config: &VenueConfig,
    base: &str,
    quote: &str,
    timeout: Duration,
) -> VenueLoad
where
    F: SnapshotFetcher + ?Sized,
{
    let venue = config.venue;
    let url = config.snapshot_url(base, quote);

    let started = Instant::now();
    let fetched = tokio::time::timeout(timeout, fetcher.fetch(&url))
        .await
        .unwrap_or(Err(FetchError::Timeout));
    metrics::histogram!("lobx_fetch_seconds", "venue" => venue.name())
        .record(started.elapsed().as_secs_f64());

    let raw = match fetched {
        Ok(raw) => raw,
        Err(e) => {
            warn!(%venue, %url, error = %e, "Failed to fetch snapshot, venue skipped");
            return VenueLoad::unavailable(venue, "fetch", e.to_string());
        }
    };

    match venue.parse(&raw) {
        Ok(book) => {
            info!(
                %venue,
                bids = book.bids.len(),
                asks = book.asks.len(),
                skipped = book.skipped,
                "Snapshot parsed"
            );
            if book.skipped > 0 {
                warn!(%venue, skipped = book.skipped, "Dropped malformed levels");
            }
            metrics::counter!("lobx_venue_levels_total", "venue" => venue.name(), "side" => "bids")
                .increment(book.bids.len() as u64);
            metrics::counter!("lobx_venue_levels_total", "venue" => venue.name(), "side" => "asks")
                .increment(book.asks.len() as u64);

            let status = VenueStatus::Available {
                venue,
                bids: book.bids.len(),
                asks: book.asks.len(),
                skipped: book.skipped,
            };
            VenueLoad { book, status }
        }
        Err(e) => {
            warn!(%venue, error = %e, "Failed to parse snapshot, venue skipped");
            VenueLoad::unavailable(venue, "parse", e.to_string())
        }
    }
}

/// Load every configured venue. Results come back in configured order either way.
pub async fn load_venues<F>(fetcher: &F, config: &AggregatorConfig) -> Vec<VenueLoad>
where
    F: SnapshotFetcher + ?Sized,
{
    let timeout = config.fetch_timeout();
    if config.concurrent_fetch {
        join_all(
            config
                .venues
                .iter()
                .map(|v| load_venue(fetcher, v, &config.base, &config.quote, timeout)),
        )
        .await
    } else {
        let mut loads = Vec::with_capacity(config.venues.len());
        for v in &config.venues {
            loads.push(load_venue(fetcher, v, &config.base, &config.quote, timeout).await);
        }
        loads
    }
}

/// Run one full query for `quantity` across every configured venue.
///
/// Always answers with whatever venues succeeded; with none, both sides are a
/// total shortfall.
#[instrument(skip_all, fields(base = %config.base, quote = %config.quote, quantity = %quantity))]
pub async fn run_query<F>(fetcher: &F, config: &AggregatorConfig, quantity: Quantity) -> QueryReport
where
    F: SnapshotFetcher + ?Sized,
{
    let loads = load_venues(fetcher, config).await;
    let book = CompositeBook::from_venues(loads.iter().map(|l| &l.book));
    let statuses: Vec<VenueStatus> = loads.into_iter().map(|l| l.status).collect();

    let available = statuses.iter().filter(|s| s.is_available()).count();
    if available == 0 {
        warn!("No venue returned a usable snapshot");
    }

    let report = QueryReport::from_book(config, quantity, &book, statuses);
    info!(
        venues = available,
        buy_complete = report.buy.is_complete(),
        sell_complete = report.sell.is_complete(),
        "Query complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    struct StubFetcher {
        responses: HashMap<String, Result<String, FetchError>>,
        delay: Option<Duration>,
    }

    impl StubFetcher {
        fn new() -> Self {
            Self { responses: HashMap::new(), delay: None }
        }

        fn with(mut self, url: &str, response: Result<&str, FetchError>) -> Self {
            self.responses.insert(url.to_string(), response.map(str::to_string));
            self
        }
    }

    #[async_trait::async_trait]
    impl SnapshotFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.responses
                .get(url)
                .cloned()
                .unwrap_or_else(|| Err(FetchError::Status { status: 404, body: String::new() }))
        }
    }

    fn config(concurrent: bool) -> AggregatorConfig {
        AggregatorConfig {
            base: "BTC".to_string(),
            quote: "USD".to_string(),
            venues: vec![
                VenueConfig { venue: Venue::Coinbase, url: Some("stub://coinbase".into()) },
                VenueConfig { venue: Venue::Gemini, url: Some("stub://gemini".into()) },
                VenueConfig { venue: Venue::Kraken, url: Some("stub://kraken".into()) },
            ],
            fetch_timeout_ms: 1_000,
            concurrent_fetch: concurrent,
        }
    }

    const COINBASE: &str = r#"{"bids": [["99", "1", 1]], "asks": [["100", "1", 1]]}"#;
    const GEMINI: &str = r#"{"bids": [{"price": "99", "amount": "2"}], "asks": [{"price": "101", "amount": "2"}]}"#;
    const KRAKEN: &str = r#"{"error": [], "result": {"XXBTZUSD": {"bids": [["98", "5", 0]], "asks": [["102", "5", 0]]}}}"#;

    fn healthy() -> StubFetcher {
        StubFetcher::new()
            .with("stub://coinbase", Ok(COINBASE))
            .with("stub://gemini", Ok(GEMINI))
            .with("stub://kraken", Ok(KRAKEN))
    }

    #[tokio::test]
    async fn test_full_query_across_three_venues() {
        let report = run_query(&healthy(), &config(true), Quantity::new(dec!(2)).unwrap()).await;

        assert_eq!(report.buy.total_value, dec!(201));
        assert!(report.buy.is_complete());
        assert_eq!(report.buy.average_price, Some(dec!(100.5)));
        // Coinbase and Gemini tie at 99; Coinbase was configured first
        assert_eq!(report.sell.total_value, dec!(198));
        assert_eq!(report.sell_fills[0].venue, "Coinbase");
        assert_eq!(report.sell_fills[1].venue, "Gemini");

        assert_eq!(report.best_bid.as_ref().unwrap().price, dec!(99));
        assert_eq!(report.best_ask.as_ref().unwrap().venue, "Coinbase");
        assert!(report.venues.iter().all(VenueStatus::is_available));

        let plan: Vec<(&str, Side, Decimal, Decimal)> = report
            .routing_plan
            .iter()
            .map(|o| (o.venue.as_str(), o.side, o.limit_price, o.total_size))
            .collect();
        assert_eq!(
            plan,
            vec![
                ("Coinbase", Side::Buy, dec!(100), dec!(1)),
                ("Coinbase", Side::Sell, dec!(99), dec!(1)),
                ("Gemini", Side::Buy, dec!(101), dec!(1)),
                ("Gemini", Side::Sell, dec!(99), dec!(1)),
                ("Kraken", Side::Buy, Decimal::ZERO, Decimal::ZERO),
                ("Kraken", Side::Sell, Decimal::ZERO, Decimal::ZERO),
            ]
        );
        assert_eq!(report.limit_orders(Side::Buy).filter(|o| o.is_actionable()).count(), 2);
    }

    #[tokio::test]
    async fn test_failed_venues_degrade_not_abort() {
        let fetcher = StubFetcher::new()
            .with("stub://coinbase", Err(FetchError::Network("connection reset".into())))
            .with("stub://gemini", Ok("not json"))
            .with("stub://kraken", Ok(KRAKEN));
        let report = run_query(&fetcher, &config(true), Quantity::new(dec!(1)).unwrap()).await;

        assert!(!report.venues[0].is_available());
        assert!(!report.venues[1].is_available());
        assert!(report.venues[2].is_available());
        assert_eq!(report.buy.total_value, dec!(102));
        assert_eq!(report.sell.total_value, dec!(98));
        assert_eq!(report.routing_plan.len(), 6);
    }

    #[tokio::test]
    async fn test_no_venues_is_total_shortfall() {
        let report = run_query(&StubFetcher::new(), &config(true), Quantity::new(dec!(3)).unwrap()).await;

        assert_eq!(report.buy.shortfall, dec!(3));
        assert_eq!(report.sell.shortfall, dec!(3));
        assert_eq!(report.buy.average_price, None);
        assert!(report.buy_fills.is_empty());
        assert!(report.routing_plan.iter().all(|o| !o.is_actionable()));
        assert!(report.best_bid.is_none());
    }

    #[tokio::test]
    async fn test_shortfall_is_reported_not_hidden() {
        let report = run_query(&healthy(), &config(true), Quantity::new(dec!(100)).unwrap()).await;

        // 8 units of ask depth in total
        assert_eq!(report.buy.shortfall, dec!(92));
        assert!(!report.buy.is_complete());
        assert_eq!(report.buy.total_value, dec!(100) + dec!(202) + dec!(510));
    }

    #[tokio::test]
    async fn test_sequential_matches_concurrent() {
        let q = Quantity::new(dec!(4)).unwrap();
        let concurrent = run_query(&healthy(), &config(true), q).await;
        let sequential = run_query(&healthy(), &config(false), q).await;
        assert_eq!(concurrent, sequential);
    }

    #[tokio::test]
    async fn test_slow_venue_times_out() {
        let mut fetcher = healthy();
        fetcher.delay = Some(Duration::from_millis(200));
        let mut cfg = config(true);
        cfg.fetch_timeout_ms = 20;

        let load = load_venue(&fetcher, &cfg.venues[0], "BTC", "USD", cfg.fetch_timeout()).await;
        assert_eq!(
            load.status,
            VenueStatus::Unavailable { venue: Venue::Coinbase, reason: FetchError::Timeout.to_string() }
        );
        assert!(load.book.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_level_does_not_sink_the_query() {
        let huge = r#"{"bids": [], "asks": [{"price": "1000000000000000", "amount": "1000000000000000"}]}"#;
        let fetcher = healthy().with("stub://gemini", Ok(huge));
        let q = Quantity::new(dec!(1000000000000000)).unwrap();
        let report = run_query(&fetcher, &config(true), q).await;

        // the level is dropped, Gemini stays available with nothing on the book
        assert_eq!(
            report.venues[1],
            VenueStatus::Available { venue: Venue::Gemini, bids: 0, asks: 0, skipped: 1 }
        );
        assert!(report.venues.iter().all(VenueStatus::is_available));
        assert_eq!(report.buy.error, None);
        assert_eq!(report.buy_fills.len(), 2);
        assert_eq!(report.buy.total_value, dec!(100) + dec!(510));
    }

    #[test]
    fn test_overflowing_side_fails_alone() {
        let big = Decimal::MAX / dec!(2) + dec!(1);
        let book = CompositeBook::from_venues([&VenueBook {
            bids: vec![PriceLevel::new(dec!(99), dec!(5), "Coinbase")],
            asks: vec![PriceLevel::new(big, dec!(1), "Coinbase"), PriceLevel::new(big, dec!(1), "Kraken")],
            skipped: 0,
        }]);
        let report = QueryReport::from_book(&config(true), Quantity::new(dec!(2)).unwrap(), &book, Vec::new());

        assert!(report.buy.error.is_some());
        assert!(!report.buy.is_complete());
        assert_eq!(report.buy.shortfall, dec!(2));
        assert!(report.buy_fills.is_empty());
        assert!(report.limit_orders(Side::Buy).all(|o| !o.is_actionable()));

        assert_eq!(report.sell.error, None);
        assert_eq!(report.sell.total_value, dec!(198));
        assert!(report.sell.is_complete());
    }

    #[test]
    fn test_from_book_uses_configured_venue_order() {
        let mut cfg = config(true);
        cfg.venues.reverse();
        let book = CompositeBook::from_venues(std::iter::empty());
        let report = QueryReport::from_book(&cfg, Quantity::new(dec!(1)).unwrap(), &book, Vec::new());

        let venues: Vec<&str> = report.routing_plan.iter().map(|o| o.venue.as_str()).collect();
        assert_eq!(venues, vec!["Kraken", "Kraken", "Gemini", "Gemini", "Coinbase", "Coinbase"]);
    }
}
