//! CLI definition and dispatch.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::{
    CsvAllocationAdapter, CsvPriceAdapter, CsvSnapshotAdapter, write_market_table, write_value_series,
};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::timeout_price_port::TimeoutPricePort;
use crate::domain::allocation::{
    Allocation, AllocationConfig, DEFAULT_INITIAL_INVESTMENT, DEFAULT_SHARE_DECIMALS, load_allocation,
};
use crate::domain::assessment::assess;
use crate::domain::backtest::{BacktestConfig, DEFAULT_MAX_WORKERS, run_backtest};
use crate::domain::config_validation::{
    DataSource, data_source, optional_date, parse_tape_list, required_string, validate_market_config,
    validate_portfolio_config, validate_tape_config, yield_scale,
};
use crate::domain::currency::ExchangeRates;
use crate::domain::error::MarketLensError;
use crate::domain::market_analytics::{MarketFilter, MarketHighlights, MarketSummary, SectorMetrics};
use crate::domain::market_data::load_market_table;
use crate::domain::session_cache::{DEFAULT_MAX_SCOPES, DEFAULT_TTL_SECS, SessionCache};
use crate::domain::tape::{TapeEntry, TapeService};
use crate::domain::valuation::{DEFAULT_LOOKBACK_DAYS, value_portfolio};
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PricePort;
use crate::ports::snapshot_port::SnapshotPort;

pub const DEFAULT_FETCH_TIMEOUT_SECS: i64 = 30;
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Parser, Debug)]
#[command(name = "marketlens", about = "Market data scoring and portfolio backtesting")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Prepare the market snapshot and print summary, highlights and sector metrics
    Market {
        #[arg(short, long)]
        config: PathBuf,
        /// Keep only these sectors (repeatable)
        #[arg(long)]
        sector: Vec<String>,
        /// Keep only these countries (repeatable)
        #[arg(long)]
        country: Vec<String>,
        /// Minimum market cap in EUR
        #[arg(long)]
        min_cap: Option<f64>,
        /// Write the prepared table to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Backtest the equal-weight portfolio
    Portfolio {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Write the value series to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Value the portfolio at the latest available closes
    Valuation {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Assess one instrument against its sector
    Assess {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: String,
    },
    /// Print the daily change of the tape tickers
    Tape {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

impl Command {
    pub fn config_path(&self) -> &Path {
        match self {
            Command::Market { config, .. }
            | Command::Portfolio { config, .. }
            | Command::Valuation { config, .. }
            | Command::Assess { config, .. }
            | Command::Tape { config }
            | Command::Validate { config } => config.as_path(),
        }
    }
}

/// Installs the stderr subscriber. `RUST_LOG` wins over `[logging] filter`.
pub fn init_logging(config_filter: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config_filter.unwrap_or(DEFAULT_LOG_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// `[logging] filter` from the command's config, if it can be read.
pub fn config_log_filter(path: &Path) -> Option<String> {
    FileConfigAdapter::from_file(path)
        .ok()
        .and_then(|c| c.get_string("logging", "filter"))
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Market {
            config,
            sector,
            country,
            min_cap,
            output,
        } => {
            let filter = MarketFilter {
                sectors: sector,
                countries: country,
                min_market_cap: min_cap,
                ..MarketFilter::default()
            };
            run_market(&config, &filter, output.as_deref())
        }
        Command::Portfolio {
            config,
            start,
            end,
            output,
        } => run_portfolio(&config, start, end, output.as_deref()),
        Command::Valuation { config, as_of } => run_valuation(&config, as_of),
        Command::Assess { config, ticker } => run_assess(&config, &ticker),
        Command::Tape { config } => run_tape(&config),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = MarketLensError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(err: &MarketLensError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

/// Static EUR table with `[rates]` overrides applied.
pub fn build_exchange_rates(config: &dyn ConfigPort) -> ExchangeRates {
    let mut rates = ExchangeRates::eur_based();
    for currency in config.section_keys("rates") {
        let rate = config.get_double("rates", &currency, 0.0);
        if rate.is_finite() && rate > 0.0 {
            rates.set_rate(&currency, rate);
        }
    }
    rates
}

pub fn build_allocation_config(config: &dyn ConfigPort) -> AllocationConfig {
    AllocationConfig {
        initial_investment: config.get_double("portfolio", "initial_investment", DEFAULT_INITIAL_INVESTMENT),
        share_decimals: config
            .get_int("portfolio", "share_decimals", DEFAULT_SHARE_DECIMALS as i64)
            .clamp(0, 8) as u32,
    }
}

/// Window from the config, with command-line overrides. A missing end date
/// means `today`.
pub fn build_backtest_config(
    config: &dyn ConfigPort,
    start_override: Option<NaiveDate>,
    end_override: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<BacktestConfig, MarketLensError> {
    let start_date = match start_override {
        Some(d) => d,
        None => optional_date(config, "portfolio", "start_date")?.ok_or_else(|| MarketLensError::ConfigMissing {
            section: "portfolio".into(),
            key: "start_date".into(),
        })?,
    };
    let end_date = match end_override {
        Some(d) => d,
        None => optional_date(config, "portfolio", "end_date")?.unwrap_or(today),
    };
    if start_date >= end_date {
        return Err(MarketLensError::invalid(
            "portfolio",
            "start_date",
            format!("start_date {start_date} must be before end_date {end_date}"),
        ));
    }

    Ok(BacktestConfig {
        start_date,
        end_date,
        max_workers: config.get_int("portfolio", "max_workers", DEFAULT_MAX_WORKERS as i64).max(1) as usize,
    })
}

pub fn build_snapshot_port(config: &dyn ConfigPort) -> Result<Box<dyn SnapshotPort>, MarketLensError> {
    let port: Box<dyn SnapshotPort> = match data_source(config)? {
        DataSource::Csv => Box::new(CsvSnapshotAdapter::new(
            PathBuf::from(required_string(config, "data", "snapshot_path")?),
            yield_scale(config, "data", "snapshot_yield_scale")?,
        )),
        DataSource::Sqlite => sqlite_snapshot(config)?,
    };
    Ok(port)
}

/// The configured price source behind a per-fetch deadline.
pub fn build_price_port(config: &dyn ConfigPort) -> Result<TimeoutPricePort, MarketLensError> {
    let inner: Arc<dyn PricePort> = match data_source(config)? {
        DataSource::Csv => Arc::new(CsvPriceAdapter::new(PathBuf::from(required_string(
            config,
            "data",
            "prices_dir",
        )?))),
        DataSource::Sqlite => sqlite_prices(config)?,
    };
    let timeout_secs = config
        .get_int("portfolio", "fetch_timeout_secs", DEFAULT_FETCH_TIMEOUT_SECS)
        .max(1) as u64;
    Ok(TimeoutPricePort::new(inner, Duration::from_secs(timeout_secs)))
}

pub fn build_allocation_port(config: &dyn ConfigPort) -> Result<CsvAllocationAdapter, MarketLensError> {
    Ok(CsvAllocationAdapter::new(
        PathBuf::from(required_string(config, "data", "allocation_path")?),
        yield_scale(config, "data", "allocation_yield_scale")?,
    ))
}

pub fn build_tape_entries(config: &dyn ConfigPort) -> Vec<TapeEntry> {
    config
        .get_string("tape", "tickers")
        .map(|raw| {
            parse_tape_list(&raw)
                .into_iter()
                .map(|(label, ticker)| TapeEntry { label, ticker })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(feature = "sqlite")]
fn sqlite_snapshot(config: &dyn ConfigPort) -> Result<Box<dyn SnapshotPort>, MarketLensError> {
    Ok(Box::new(crate::adapters::sqlite_adapter::SqliteAdapter::from_config(config)?))
}

#[cfg(feature = "sqlite")]
fn sqlite_prices(config: &dyn ConfigPort) -> Result<Arc<dyn PricePort>, MarketLensError> {
    Ok(Arc::new(crate::adapters::sqlite_adapter::SqliteAdapter::from_config(config)?))
}

#[cfg(not(feature = "sqlite"))]
fn sqlite_snapshot(_config: &dyn ConfigPort) -> Result<Box<dyn SnapshotPort>, MarketLensError> {
    Err(sqlite_unavailable())
}

#[cfg(not(feature = "sqlite"))]
fn sqlite_prices(_config: &dyn ConfigPort) -> Result<Arc<dyn PricePort>, MarketLensError> {
    Err(sqlite_unavailable())
}

#[cfg(not(feature = "sqlite"))]
fn sqlite_unavailable() -> MarketLensError {
    MarketLensError::invalid("data", "source", "sqlite support is not compiled in")
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn run_market(config_path: &Path, filter: &MarketFilter, output: Option<&Path>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_market_config(&config) {
        return fail(&e);
    }
    let port = match build_snapshot_port(&config) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };

    let table = load_market_table(port.as_ref(), &build_exchange_rates(&config));
    if table.is_empty() {
        eprintln!("error: no market data available");
        return ExitCode::from(5);
    }
    let table = filter.apply(&table);

    let summary = MarketSummary::compute(&table.rows);
    eprintln!("\n=== Market Summary ===");
    eprintln!("Companies:        {}", summary.companies);
    eprintln!("Total Cap:        {:.2} bn EUR", summary.total_market_cap / 1e9);
    eprintln!("Average PER:      {:.2}", summary.avg_per);
    eprintln!("Average Yield:    {:.2}%", summary.avg_yield);
    eprintln!("Average 52w:      {:.2}%", summary.avg_week52_change);

    let highlights = MarketHighlights::compute(&table.rows);
    eprintln!("\n=== Best 52-week Performers ===");
    for h in &highlights.best_performers {
        eprintln!("  {:<12} {:<32} {:+.2}%", h.ticker, h.full_name, h.value);
    }
    eprintln!("\n=== Worst 52-week Performers ===");
    for h in &highlights.worst_performers {
        eprintln!("  {:<12} {:<32} {:+.2}%", h.ticker, h.full_name, h.value);
    }
    eprintln!("\n=== Highest Dividend Yields ===");
    for h in &highlights.highest_dividends {
        eprintln!("  {:<12} {:<32} {:.2}%", h.ticker, h.full_name, h.value);
    }
    eprintln!("\n=== Sector Allocation ===");
    for s in &highlights.sector_allocation {
        eprintln!("  {:<32} {:>6.2}%", s.sector, s.percent);
    }

    eprintln!("\n=== Sector Metrics ===");
    for m in SectorMetrics::compute(&table.rows) {
        eprintln!(
            "  {:<32} {:>3} cos, PER {:>6.2}, yield {:>5.2}%, score {:>5.1}",
            m.sector, m.companies, m.avg_per, m.avg_yield, m.avg_score
        );
    }

    if let Some(path) = output {
        if let Err(e) = write_market_table(path, &table) {
            return fail(&e);
        }
        eprintln!("\nPrepared table written to: {}", path.display());
    }
    ExitCode::SUCCESS
}

fn load_portfolio(config: &FileConfigAdapter) -> Result<Allocation, MarketLensError> {
    validate_portfolio_config(config)?;
    let port = build_allocation_port(config)?;
    Ok(load_allocation(
        &port,
        &build_allocation_config(config),
        &build_exchange_rates(config),
    ))
}

fn run_portfolio(
    config_path: &Path,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    output: Option<&Path>,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let allocation = match load_portfolio(&config) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };
    if allocation.is_empty() {
        eprintln!("error: allocation is empty");
        return ExitCode::from(5);
    }
    let (bt_config, prices) = match build_backtest_config(&config, start, end, today())
        .and_then(|bt| build_price_port(&config).map(|p| (bt, p)))
    {
        Ok(pair) => pair,
        Err(e) => return fail(&e),
    };

    eprintln!(
        "Running backtest: {} constituents, {} to {}",
        allocation.len(),
        bt_config.start_date,
        bt_config.end_date
    );
    let result = run_backtest(&allocation, &prices, &bt_config);
    let m = &result.metrics;

    eprintln!("\n=== Portfolio Results ===");
    eprintln!("Initial Value:    {:.2} EUR", m.initial_value);
    eprintln!("Final Value:      {:.2} EUR", m.final_value);
    eprintln!("Total Variation:  {:+.2}%", m.total_variation);
    eprintln!("Volatility (ann): {:.2}%", m.annualized_volatility);
    eprintln!("Max Drawdown:     {:.2}%", m.max_drawdown);
    eprintln!("Fallbacks:        {}", result.fallback_count());
    if let Some(avg) = allocation.average_yield() {
        eprintln!("Average Yield:    {:.2}%", avg);
    }
    if let Some(beta) = allocation.weighted_beta() {
        eprintln!("Portfolio Beta:   {:.2}", beta);
    }

    eprintln!("\n=== Top Performers ===");
    for p in &result.ranking.top {
        eprintln!("  {:<12} {:+.2}%  {:.2} EUR", p.ticker, p.variation, p.current_value);
    }
    eprintln!("\n=== Bottom Performers ===");
    for p in &result.ranking.bottom {
        eprintln!("  {:<12} {:+.2}%  {:.2} EUR", p.ticker, p.variation, p.current_value);
    }

    eprintln!("\n=== Allocation by Sector ===");
    for slice in allocation.by_sector() {
        eprintln!("  {:<32} {:.2} EUR", slice.label, slice.value);
    }
    eprintln!("\n=== Allocation by Country ===");
    for slice in allocation.by_country() {
        eprintln!("  {:<32} {:.2} EUR", slice.label, slice.value);
    }

    if let Some(path) = output {
        if let Err(e) = write_value_series(path, &result.series) {
            return fail(&e);
        }
        eprintln!("\nValue series written to: {}", path.display());
    }
    ExitCode::SUCCESS
}

fn run_valuation(config_path: &Path, as_of: Option<NaiveDate>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let allocation = match load_portfolio(&config) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };
    let prices = match build_price_port(&config) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let lookback = config.get_int("portfolio", "valuation_lookback_days", DEFAULT_LOOKBACK_DAYS);
    let valuation = value_portfolio(&allocation, &prices, as_of.unwrap_or_else(today), lookback);

    eprintln!("\n=== Valuation as of {} ===", valuation.as_of);
    for p in &valuation.positions {
        let price = match (p.last_close, p.price_date) {
            (Some(close), Some(date)) => format!("{close:.2} on {date}"),
            _ => "initial value".to_string(),
        };
        eprintln!(
            "  {:<12} {:>10.2} sh  {:<24} {:>14.2} EUR  {:+.2}%",
            p.ticker, p.shares, price, p.current_value, p.variation
        );
    }
    eprintln!("\nInitial Value:    {:.2} EUR", valuation.total_initial_value);
    eprintln!("Current Value:    {:.2} EUR", valuation.total_current_value);
    eprintln!("Variation:        {:+.2}%", valuation.variation);
    ExitCode::SUCCESS
}

fn run_assess(config_path: &Path, ticker: &str) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_market_config(&config) {
        return fail(&e);
    }
    let port = match build_snapshot_port(&config) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    let table = load_market_table(port.as_ref(), &build_exchange_rates(&config));

    let Some(a) = assess(&table, ticker) else {
        return fail(&MarketLensError::NoData {
            ticker: ticker.to_string(),
        });
    };

    eprintln!("\n=== {} ({}) ===", a.full_name, a.ticker);
    eprintln!("Momentum:         {}", a.momentum);
    eprintln!("Valuation:        {}", a.valuation);
    eprintln!("Risk:             {}", a.risk);
    eprintln!("\n=== Sector: {} ({} companies) ===", a.sector.sector, a.sector.peers);
    eprintln!("Average PER:      {:.2}", a.sector.avg_per);
    match a.sector.avg_beta {
        Some(beta) => eprintln!("Average Beta:     {beta:.2}"),
        None => eprintln!("Average Beta:     n/a"),
    }
    eprintln!("Average Yield:    {:.2}%", a.sector.avg_yield);
    ExitCode::SUCCESS
}

fn run_tape(config_path: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_tape_config(&config) {
        return fail(&e);
    }
    let prices = match build_price_port(&config) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };

    let ttl = config.get_int("tape", "ttl_secs", DEFAULT_TTL_SECS as i64).max(1) as u64;
    let service = TapeService::new(
        build_tape_entries(&config),
        SessionCache::new(Duration::from_secs(ttl), DEFAULT_MAX_SCOPES),
    );

    let quotes = service.quotes("cli", &prices, today());
    if quotes.is_empty() {
        eprintln!("error: no tape quotes available");
        return ExitCode::from(5);
    }
    for q in &quotes {
        let arrow = if q.is_up() { "▲" } else { "▼" };
        println!("{}: {:.2} ({} {:.2}%)", q.label, q.last_close, arrow, q.change_pct);
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let has_snapshot = config.get_string("data", "snapshot_path").is_some();
    let has_allocation = config.get_string("data", "allocation_path").is_some();
    let has_tape = !config.section_keys("tape").is_empty();

    if has_snapshot || data_source(&config).ok() == Some(DataSource::Sqlite) {
        if let Err(e) = validate_market_config(&config) {
            return fail(&e);
        }
        eprintln!("  market: ok");
    }
    if has_allocation {
        if let Err(e) = validate_portfolio_config(&config) {
            return fail(&e);
        }
        eprintln!("  portfolio: ok");
    }
    if has_tape {
        if let Err(e) = validate_tape_config(&config) {
            return fail(&e);
        }
        eprintln!("  tape: ok");
    }
    if !(has_snapshot || has_allocation || has_tape) {
        return fail(&MarketLensError::ConfigMissing {
            section: "data".into(),
            key: "snapshot_path".into(),
        });
    }

    eprintln!("\nConfiguration is valid");
    ExitCode::SUCCESS
}
