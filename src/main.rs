use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use lobx_agg::market_data::router::{QueryReport, SideSummary, VenueStatus};
use lobx_agg::{run_query, telemetry, AggregatorConfig, HttpFetcher, Quantity, Venue};

#[derive(Debug, Parser)]
#[command(
    name = "lobx-agg",
    version,
    about = "Price a market order against the combined order books of several exchanges"
)]
struct Args {
    /// Order size in the base asset. Prompted for when omitted.
    #[arg(short, long)]
    quantity: Option<String>,

    /// Configuration file (TOML). Defaults to ./lobx-agg.toml when present.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only query these venues, in this order. Repeatable.
    #[arg(long = "venue", value_name = "VENUE")]
    venues: Vec<Venue>,

    /// Print the full report as JSON instead of text.
    #[arg(long)]
    json: bool,

    #[arg(long, default_value = "info")]
    log_filter: String,

    /// Port for the Prometheus exporter (`metrics-exporter` builds only).
    #[arg(long, default_value_t = 9000, hide = !cfg!(feature = "metrics-exporter"))]
    metrics_port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // load .env

    let args = Args::parse();
    telemetry::init_tracing(&args.log_filter);
    telemetry::init_metrics(args.metrics_port)?;

    let mut config = AggregatorConfig::load(args.config.as_deref()).context("loading configuration")?;
    if !args.venues.is_empty() {
        config.restrict_venues(&args.venues);
    }

    // Validate the size before touching the network
    let input = match args.quantity {
        Some(q) => q,
        None => prompt_quantity(&config.base)?,
    };
    let quantity = Quantity::parse_order_size(&input).context("invalid quantity")?;

    let fetcher = HttpFetcher::new(config.fetch_timeout())?;
    let report = run_query(&fetcher, &config, quantity).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn prompt_quantity(base: &str) -> anyhow::Result<String> {
    print!("Enter quantity of {} to buy/sell: ", base);
    io::stdout().flush()?;

    let mut input = String::new();
    if io::stdin().lock().read_line(&mut input)? == 0 {
        bail!("no quantity given");
    }
    Ok(input)
}

fn print_side(report: &QueryReport, summary: &SideSummary, verb: &str, label: &str) {
    if let Some(err) = &summary.error {
        println!("Could not price {} {} {}: {}", verb, report.quantity, report.base, err);
    } else if summary.is_complete() {
        let per_unit = summary
            .average_price
            .map(|p| format!(" at a price: ${:.2}", p))
            .unwrap_or_default();
        println!(
            "{} {} {}: ${:.2}{}",
            label, report.quantity, report.base, summary.total_value, per_unit
        );
    } else {
        println!(
            "Not enough liquidity to {} {} {} (short by {})",
            verb,
            report.quantity,
            report.base,
            summary.shortfall.normalize()
        );
    }
}

fn print_report(report: &QueryReport) {
    for status in &report.venues {
        if let VenueStatus::Unavailable { venue, reason } = status {
            println!("{} unavailable: {}", venue, reason);
        }
    }

    print_side(report, &report.buy, "buy", "Cost to buy");
    print_side(report, &report.sell, "sell", "Proceeds from selling");

    println!("Buy orders: {}", report.buy_fills.len());
    println!("Sell orders: {}", report.sell_fills.len());

    for order in &report.routing_plan {
        println!(
            "{} {} Limit Order: [Price: ${}, Size: {} {}]",
            order.venue,
            order.side,
            order.limit_price.normalize(),
            order.total_size.normalize(),
            report.base
        );
    }
}
