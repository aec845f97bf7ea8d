//! Calendar arbitrage engine entry point.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use calendar_arb::arbitrage::{ArbitrageEngine, ArbitrageReport};
use calendar_arb::config::Config;
use calendar_arb::metrics;
use calendar_arb::records::{read_records, RawFinancing, RawOperation};

/// Calendar arbitrage matching and P&L engine.
#[derive(Parser, Debug)]
#[command(name = "calendar-arb")]
#[command(about = "Match immediate vs. deferred settlement legs against repo financing and report P&L")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate one trading day.
    Analyze {
        /// JSON array of executed operations.
        #[arg(long)]
        operations: PathBuf,

        /// JSON array of financing transactions.
        #[arg(long)]
        financing: Option<PathBuf>,

        /// Trading day (YYYY-MM-DD).
        #[arg(long)]
        date: NaiveDate,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,

        /// Keep same-price legs separate.
        #[arg(long)]
        no_consolidate: bool,

        /// Evaluate groups in parallel.
        #[arg(long)]
        parallel: bool,
    },

    /// Show the deferred settlement date and tenor for a trading day.
    Tenor {
        /// Trading day (YYYY-MM-DD).
        date: NaiveDate,
    },

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load().context("Configuration load failed")?;

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("calendar_arb=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.rust_log))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }

    metrics::init_metrics();

    match args.command {
        Command::Analyze {
            operations,
            financing,
            date,
            json,
            no_consolidate,
            parallel,
        } => {
            cmd_analyze(
                config,
                &operations,
                financing.as_deref(),
                date,
                json,
                no_consolidate,
                parallel,
            )
            .await
        }
        Command::Tenor { date } => cmd_tenor(&config, date),
        Command::CheckConfig => cmd_check_config(&config),
    }
}

/// Evaluate one trading day and print the report.
async fn cmd_analyze(
    mut config: Config,
    operations: &Path,
    financing: Option<&Path>,
    date: NaiveDate,
    json: bool,
    no_consolidate: bool,
    parallel: bool,
) -> anyhow::Result<()> {
    if no_consolidate {
        config.consolidate_legs = false;
    }
    if parallel {
        config.parallel = true;
    }

    let engine = ArbitrageEngine::from_config(&config)?;
    let ops: Vec<RawOperation> = read_records(operations)
        .await
        .with_context(|| format!("loading {}", operations.display()))?;
    let fin: Vec<RawFinancing> = match financing {
        Some(path) => read_records(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?,
        None => Vec::new(),
    };
    info!(operations = ops.len(), financing = fin.len(), %date, "Records loaded");

    let run = engine.run(&ops, &fin, date, None).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run.report)?);
    } else {
        print_report(&run.report);
    }
    Ok(())
}

fn print_report(report: &ArbitrageReport) {
    println!("======================================================================");
    println!("CALENDAR ARBITRAGE - {} (tenor {}d)", report.trading_day, report.tenor_days);
    println!("======================================================================");

    if report.rates.is_empty() {
        println!("Day rates: none");
    } else {
        for (currency, rate) in report.rates.iter() {
            println!("Day rate {}: {}% TNA", currency, rate.round_dp(4));
        }
    }

    if report.is_empty() {
        println!("No patterns found");
        return;
    }

    println!("----------------------------------------------------------------------");
    println!(
        "{:<10} {:<24} {:<22} {:>16} {:>16} {:>16}",
        "INSTR", "PATTERN", "STATUS", "TRADE", "FINANCING", "TOTAL"
    );
    for r in &report.results {
        println!(
            "{:<10} {:<24} {:<22} {:>16} {:>16} {:>16}",
            r.instrument,
            r.pattern.to_string(),
            r.status.to_string(),
            r.trade_pnl.round_dp(2),
            r.financing_pnl.round_dp(2),
            r.total_pnl.round_dp(2),
        );
    }
    println!("----------------------------------------------------------------------");
    println!(
        "{:<58} {:>16} {:>16} {:>16}",
        "TOTAL",
        report.totals.trade_pnl.round_dp(2),
        report.totals.financing_pnl.round_dp(2),
        report.totals.total_pnl.round_dp(2),
    );
    for (status, count) in &report.status_counts {
        println!("  {}: {}", status, count);
    }
    println!("======================================================================");
}

/// Show the tenor for a trading day.
fn cmd_tenor(config: &Config, date: NaiveDate) -> anyhow::Result<()> {
    let engine = ArbitrageEngine::from_config(config)?;
    let resolver = engine.resolver();
    let deferred = resolver.deferred_settlement_date(date)?;
    let tenor = resolver.tenor_days(date)?;

    println!("Market:            {}", resolver.market());
    println!("Trading day:       {}", date);
    println!("Deferred settles:  {}", deferred);
    println!("Tenor:             {} day(s)", tenor);
    Ok(())
}

/// Check configuration validity.
fn cmd_check_config(config: &Config) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("CALENDAR ARB - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Market: {}", config.market);
    println!("  Settlement: {}", config.settlement_convention);
    println!("  Holidays: {}", config.market_holidays.len());
    println!("  Quote Base: {}", config.quote_base);
    println!("  Day Count Basis: {}", config.day_count_basis);
    println!("  Default Currency: {}", config.currency());
    println!("  Commission Rate: {}", config.commission_rate);
    println!("  Market Rights Rate: {}", config.market_rights_rate);
    println!("  Financing Commission Rate: {}", config.financing_commission_rate);
    println!("  Expenses Tax Rate: {}", config.expenses_tax_rate);
    println!("  Consolidate Legs: {}", config.consolidate_legs);
    println!("  Parallel: {}", config.parallel);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}
