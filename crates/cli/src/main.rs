use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use stock_ledger_core::models::purchase::{PurchaseRecord, PurchaseRequest};
use stock_ledger_core::models::settings::Settings;
use stock_ledger_core::StockTracker;

#[derive(Parser)]
#[command(name = "stock-ledger", version, about = "Track share purchases and value them")]
struct Cli {
    /// Config file (default: <config dir>/stock-ledger/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Report values in this currency instead of the configured one
    #[arg(long, global = true)]
    display_currency: Option<String>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record a purchase
    Buy {
        ticker: String,
        /// Purchase date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        #[arg(short, long)]
        quantity: Option<f64>,
        /// Unit price
        #[arg(short, long)]
        price: Option<f64>,
        /// Total paid
        #[arg(short, long)]
        total: Option<f64>,
        /// Currency of the price or total (default: display currency)
        #[arg(long)]
        currency: Option<String>,
    },
    /// List recorded purchases
    Ledger {
        ticker: String,
        #[arg(long, conflicts_with = "csv")]
        json: bool,
        #[arg(long)]
        csv: bool,
    },
    /// Total shares and cost
    Holdings { ticker: String },
    /// Holdings valued at the current price
    Value { ticker: String },
    /// Check whether the price is below the average purchase price
    Discount {
        ticker: String,
        /// Required discount as a fraction, e.g. 0.15
        #[arg(long)]
        threshold: f64,
    },
    /// Company profile
    Info {
        ticker: String,
        /// Fetch again even if a saved profile exists
        #[arg(long)]
        refresh: bool,
    },
    /// Export daily closing prices to history.csv
    History {
        ticker: String,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
}

impl Command {
    fn ticker(&self) -> &str {
        match self {
            Command::Buy { ticker, .. }
            | Command::Ledger { ticker, .. }
            | Command::Holdings { ticker }
            | Command::Value { ticker }
            | Command::Discount { ticker, .. }
            | Command::Info { ticker, .. }
            | Command::History { ticker, .. } => ticker,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = load_settings(&cli)?;
    let mut tracker = StockTracker::open(cli.command.ticker(), settings)
        .with_context(|| format!("Could not open ledger for {}", cli.command.ticker()))?;
    tracing::debug!(providers = ?tracker.provider_names(), "providers ready");

    run(&mut tracker, cli.command).await
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => Settings::default_config_path(),
    };
    let mut settings = match path {
        Some(path) => Settings::load(&path)
            .with_context(|| format!("Could not load config from {}", path.display()))?,
        None => Settings::default(),
    };
    if let Some(currency) = &cli.display_currency {
        settings.set_display_currency(currency)?;
    }
    Ok(settings)
}

async fn run(tracker: &mut StockTracker, command: Command) -> Result<()> {
    match command {
        Command::Buy {
            date,
            quantity,
            price,
            total,
            currency,
            ..
        } => {
            let mut request = PurchaseRequest::new(date);
            request.quantity = quantity;
            request.unit_price = price;
            request.total_paid = total;
            request.currency = currency;

            let record = tracker.record_purchase(request).await?;
            println!("Recorded:");
            print_records(std::slice::from_ref(&record));
        }
        Command::Ledger { json, csv, .. } => {
            if json {
                print!("{}", tracker.export_purchases_json()?);
            } else if csv {
                print!("{}", tracker.export_purchases_csv());
            } else if tracker.records().is_empty() {
                println!("No purchases recorded for {}", tracker.ticker());
            } else {
                print_records(tracker.records());
            }
        }
        Command::Holdings { .. } => {
            let holdings = tracker.current_holdings().await?;
            println!("Shares:     {:.4}", holdings.total_shares);
            println!("Total cost: {:.2} {}", holdings.total_cost, holdings.currency);
            if let Ok(avg) = holdings.average_unit_cost() {
                println!("Avg price:  {:.2} {}", avg, holdings.currency);
            }
        }
        Command::Value { .. } => {
            let snapshot = tracker.valuation_snapshot().await?;
            let ccy = &snapshot.currency;
            println!("Shares:        {:.4}", snapshot.total_shares);
            println!("Total cost:    {:.2} {ccy}", snapshot.total_cost);
            println!("Current price: {:.2} {ccy}", snapshot.current_price);
            println!("Current value: {:.2} {ccy}", snapshot.current_value);
            println!("Gain/loss:     {:.2} {ccy}", snapshot.gain_loss());
            match snapshot.roi() {
                Ok(roi) => println!("ROI:           {:.2}%", roi * 100.0),
                Err(e) => println!("ROI:           n/a ({e})"),
            }
        }
        Command::Discount { threshold, .. } => {
            let discounted = tracker.is_current_price_avg_discount(threshold).await?;
            if discounted {
                println!(
                    "{} trades at least {:.1}% below the average purchase price",
                    tracker.ticker(),
                    threshold * 100.0
                );
            } else {
                println!(
                    "{} does not trade {:.1}% below the average purchase price",
                    tracker.ticker(),
                    threshold * 100.0
                );
            }
        }
        Command::Info { refresh, .. } => {
            let profile = tracker.company_profile(refresh).await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Command::History { from, to, .. } => {
            let (path, points) = tracker.export_price_history(from, to).await?;
            println!("Wrote {} closes to {}", points.len(), path.display());
        }
    }
    Ok(())
}

fn print_records(records: &[PurchaseRecord]) {
    println!(
        "{:<10}  {:>12}  {:>12}  {:>3}  {:>14}",
        "date", "quantity", "unit price", "ccy", "total"
    );
    for r in records {
        println!(
            "{:<10}  {:>12.4}  {:>12.4}  {:>3}  {:>14.2}",
            r.date,
            r.quantity,
            r.unit_price,
            r.currency,
            r.total_paid()
        );
    }
}
