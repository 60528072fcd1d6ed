//! Market-data preparation: raw snapshot rows → cleaned, EUR-normalized,
//! scored table sorted by market capitalisation.
//!
//! The pipeline runs in a fixed order: numeric coercion and categorical
//! cleaning per row, market-cap conversion, scoring over the whole column
//! set, then [`finalize`]. Scores are normalized over every row, including
//! those later dropped for a non-positive market cap.

use crate::domain::cleaning::{
    NUMERIC_DEFAULT, YieldScale, clean_categorical, clean_code, clean_full_name, coerce_numeric,
    coerce_optional,
};
use crate::domain::currency::ExchangeRates;
use crate::domain::instrument::{InstrumentRecord, MarketRow};
use crate::domain::scoring::compute_scores;
use crate::ports::snapshot_port::SnapshotPort;
use std::cmp::Ordering;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanedMarketTable {
    pub rows: Vec<MarketRow>,
}

impl CleanedMarketTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn find(&self, ticker: &str) -> Option<&MarketRow> {
        self.rows
            .iter()
            .find(|row| row.ticker.eq_ignore_ascii_case(ticker.trim()))
    }

    /// Distinct sectors in alphabetical order.
    pub fn sectors(&self) -> Vec<String> {
        let mut sectors: Vec<String> = self.rows.iter().map(|r| r.sector.clone()).collect();
        sectors.sort();
        sectors.dedup();
        sectors
    }

    /// Distinct countries in alphabetical order.
    pub fn countries(&self) -> Vec<String> {
        let mut countries: Vec<String> = self.rows.iter().map(|r| r.country.clone()).collect();
        countries.sort();
        countries.dedup();
        countries
    }
}

#[derive(Debug, Clone, Default)]
pub struct MarketDataPreparer {
    rates: ExchangeRates,
    yield_scale: YieldScale,
}

impl MarketDataPreparer {
    pub fn new(rates: ExchangeRates, yield_scale: YieldScale) -> Self {
        Self { rates, yield_scale }
    }

    pub fn rates(&self) -> &ExchangeRates {
        &self.rates
    }

    pub fn yield_scale(&self) -> YieldScale {
        self.yield_scale
    }

    pub fn prepare(&self, records: &[InstrumentRecord]) -> CleanedMarketTable {
        let mut rows: Vec<MarketRow> = records
            .iter()
            .map(|r| clean_record(r, self.yield_scale))
            .collect();
        convert_market_caps(&mut rows, &self.rates);
        apply_scores(&mut rows);
        CleanedMarketTable {
            rows: finalize(rows),
        }
    }
}

/// Coerces every numeric cell and cleans every text cell of one record.
/// Score columns are left at zero until [`apply_scores`] runs.
pub fn clean_record(record: &InstrumentRecord, yield_scale: YieldScale) -> MarketRow {
    let ticker = record.ticker.trim().to_string();
    let market_cap = coerce_numeric(record.market_cap.as_deref(), NUMERIC_DEFAULT);
    let dividend_yield =
        yield_scale.to_percent(coerce_numeric(record.dividend_yield.as_deref(), NUMERIC_DEFAULT));

    MarketRow {
        full_name: clean_full_name(record.full_name.as_deref(), &ticker),
        sector: clean_categorical(record.sector.as_deref()),
        industry: clean_categorical(record.industry.as_deref()),
        country: clean_categorical(record.country.as_deref()),
        currency: clean_code(record.currency.as_deref()),
        price: coerce_numeric(record.price.as_deref(), NUMERIC_DEFAULT),
        market_cap,
        original_market_cap: market_cap,
        volume: coerce_numeric(record.volume.as_deref(), NUMERIC_DEFAULT),
        trailing_pe: coerce_numeric(record.trailing_pe.as_deref(), NUMERIC_DEFAULT),
        dividend_yield,
        week52_change: coerce_numeric(record.week52_change.as_deref(), NUMERIC_DEFAULT),
        beta: coerce_optional(record.beta.as_deref()),
        per_norm: 0.0,
        yield_norm: 0.0,
        score: 0.0,
        ticker,
    }
}

/// Rewrites each row's market cap in EUR. `original_market_cap` keeps the
/// listing-currency value.
pub fn convert_market_caps(rows: &mut [MarketRow], rates: &ExchangeRates) {
    for row in rows.iter_mut() {
        row.market_cap = rates.to_reference(row.original_market_cap, row.currency.as_deref());
    }
}

pub fn apply_scores(rows: &mut [MarketRow]) {
    let pe: Vec<f64> = rows.iter().map(|r| r.trailing_pe).collect();
    let yields: Vec<f64> = rows.iter().map(|r| r.dividend_yield).collect();

    for (row, components) in rows.iter_mut().zip(compute_scores(&pe, &yields)) {
        row.per_norm = components.per_norm;
        row.yield_norm = components.yield_norm;
        row.score = components.score;
    }
}

/// Drops rows whose EUR market cap is not positive and sorts the rest by
/// market cap, largest first. Ties keep their input order.
pub fn finalize(rows: Vec<MarketRow>) -> Vec<MarketRow> {
    let mut kept: Vec<MarketRow> = rows.into_iter().filter(|r| r.market_cap > 0.0).collect();
    kept.sort_by(|a, b| {
        b.market_cap
            .partial_cmp(&a.market_cap)
            .unwrap_or(Ordering::Equal)
    });
    kept
}

/// Loads and prepares the snapshot. A provider failure yields an empty
/// table; the caller decides how to present it.
pub fn load_market_table(port: &dyn SnapshotPort, rates: &ExchangeRates) -> CleanedMarketTable {
    match port.load_snapshot() {
        Ok(records) => {
            tracing::info!(rows = records.len(), "market snapshot loaded");
            let preparer = MarketDataPreparer::new(rates.clone(), port.yield_scale());
            let table = preparer.prepare(&records);
            tracing::info!(
                kept = table.len(),
                dropped = records.len() - table.len(),
                "market table prepared"
            );
            table
        }
        Err(e) => {
            tracing::warn!(error = %e, "market snapshot unavailable, using empty table");
            CleanedMarketTable::default()
        }
    }
}
