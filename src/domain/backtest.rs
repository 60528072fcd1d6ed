//! Backtest engine: replays an equal-weight allocation over historical
//! closes and aggregates the positions into one value series.
//!
//! Each constituent is fetched independently on a bounded thread pool.
//! A constituent whose fetch fails, times out, or returns no usable closes
//! falls back to a constant series at its initial position value, so one
//! bad ticker never aborts the run.

use super::allocation::{Allocation, AllocationEntry};
use super::metrics::{PerformanceMetrics, Performer, PerformerRanking};
use super::portfolio::PortfolioValueSeries;
use super::price_series::{align, build_date_index, clean_window, fill_gaps};
use crate::ports::price_port::PricePort;
use chrono::NaiveDate;
use rayon::prelude::*;

pub const DEFAULT_MAX_WORKERS: usize = 4;

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub max_workers: usize,
}

impl BacktestConfig {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstituentStatus {
    Reconciled,
    Fallback { reason: String },
}

impl ConstituentStatus {
    pub fn is_fallback(&self) -> bool {
        matches!(self, ConstituentStatus::Fallback { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstituentResult {
    pub ticker: String,
    pub status: ConstituentStatus,
    pub exchange_rate: f64,
    pub initial_position_value: f64,
    pub adjusted_shares: f64,
    pub first_price: Option<f64>,
    pub last_price: Option<f64>,
    pub current_value: f64,
    /// Percent change of the position over the window.
    pub variation: f64,
    /// Position value (EUR) per observed date. Empty for a fallback.
    pub values: Vec<(NaiveDate, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub series: PortfolioValueSeries,
    pub constituents: Vec<ConstituentResult>,
    pub metrics: PerformanceMetrics,
    pub ranking: PerformerRanking,
}

impl BacktestResult {
    pub fn fallback_count(&self) -> usize {
        self.constituents
            .iter()
            .filter(|c| c.status.is_fallback())
            .count()
    }
}

/// Runs the backtest of `allocation` over `[start_date, end_date]`.
pub fn run_backtest(
    allocation: &Allocation,
    prices: &dyn PricePort,
    config: &BacktestConfig,
) -> BacktestResult {
    tracing::info!(
        constituents = allocation.len(),
        start = %config.start_date,
        end = %config.end_date,
        workers = config.max_workers,
        "starting backtest"
    );

    let constituents = fetch_constituents(allocation, prices, config);
    let series = aggregate(&constituents);
    let metrics = PerformanceMetrics::compute(&series);

    let performers: Vec<Performer> = constituents
        .iter()
        .map(|c| Performer {
            ticker: c.ticker.clone(),
            variation: c.variation,
            current_value: c.current_value,
        })
        .collect();

    let result = BacktestResult {
        series,
        ranking: PerformerRanking::compute(&performers),
        constituents,
        metrics,
    };

    tracing::info!(
        dates = result.series.len(),
        fallbacks = result.fallback_count(),
        total_variation = result.metrics.total_variation,
        "backtest complete"
    );

    result
}

fn fetch_constituents(
    allocation: &Allocation,
    prices: &dyn PricePort,
    config: &BacktestConfig,
) -> Vec<ConstituentResult> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.max_workers.max(1))
        .build();

    match pool {
        Ok(pool) => pool.install(|| {
            allocation
                .entries
                .par_iter()
                .map(|entry| evaluate(entry, prices, config))
                .collect()
        }),
        Err(e) => {
            tracing::warn!(error = %e, "thread pool unavailable, fetching sequentially");
            allocation
                .entries
                .iter()
                .map(|entry| evaluate(entry, prices, config))
                .collect()
        }
    }
}

fn evaluate(entry: &AllocationEntry, prices: &dyn PricePort, config: &BacktestConfig) -> ConstituentResult {
    match prices.fetch_closes(&entry.ticker, config.start_date, config.end_date) {
        Ok(points) => {
            let cleaned = clean_window(points, config.start_date, config.end_date);
            if cleaned.is_empty() {
                tracing::warn!(ticker = %entry.ticker, "no usable closes in window, using initial value");
                return fallback(entry, "no usable closes in window".to_string());
            }
            let closes: Vec<(NaiveDate, f64)> = cleaned.iter().map(|p| (p.date, p.close)).collect();
            reconcile(entry, &closes)
        }
        Err(e) => {
            tracing::warn!(ticker = %entry.ticker, error = %e, "price fetch failed, using initial value");
            fallback(entry, e.to_string())
        }
    }
}

/// Rebases the position on the first observed close so that it starts at
/// its initial position value.
fn reconcile(entry: &AllocationEntry, closes: &[(NaiveDate, f64)]) -> ConstituentResult {
    let rate = entry.exchange_rate;
    // `closes` is non-empty with positive prices.
    let first_price = closes[0].1;
    let last_price = closes[closes.len() - 1].1;

    let adjusted_shares = entry.initial_position_value / (first_price * rate);
    let values: Vec<(NaiveDate, f64)> = closes
        .iter()
        .map(|&(date, close)| (date, close * adjusted_shares * rate))
        .collect();

    let current_value = last_price * adjusted_shares * rate;
    let variation = if entry.initial_position_value > 0.0 {
        (current_value / entry.initial_position_value - 1.0) * 100.0
    } else {
        0.0
    };

    ConstituentResult {
        ticker: entry.ticker.clone(),
        status: ConstituentStatus::Reconciled,
        exchange_rate: rate,
        initial_position_value: entry.initial_position_value,
        adjusted_shares,
        first_price: Some(first_price),
        last_price: Some(last_price),
        current_value,
        variation,
        values,
    }
}

fn fallback(entry: &AllocationEntry, reason: String) -> ConstituentResult {
    ConstituentResult {
        ticker: entry.ticker.clone(),
        status: ConstituentStatus::Fallback { reason },
        exchange_rate: entry.exchange_rate,
        initial_position_value: entry.initial_position_value,
        adjusted_shares: entry.shares,
        first_price: None,
        last_price: None,
        current_value: entry.initial_position_value,
        variation: 0.0,
        values: Vec::new(),
    }
}

/// Sums every constituent on the union of the reconciled dates. Fallbacks
/// contribute their initial value on every date.
fn aggregate(constituents: &[ConstituentResult]) -> PortfolioValueSeries {
    let index = build_date_index(
        constituents
            .iter()
            .filter(|c| !c.status.is_fallback())
            .map(|c| c.values.as_slice()),
    );
    if index.is_empty() {
        return PortfolioValueSeries::new();
    }

    let mut total = vec![0.0; index.len()];
    for c in constituents {
        let filled = match c.status {
            ConstituentStatus::Reconciled => fill_gaps(&align(&c.values, &index)),
            ConstituentStatus::Fallback { .. } => None,
        }
        .unwrap_or_else(|| vec![c.initial_position_value; index.len()]);

        for (t, v) in total.iter_mut().zip(filled) {
            *t += v;
        }
    }

    PortfolioValueSeries::from_parts(&index, &total)
}
