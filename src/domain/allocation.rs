//! Equal-weight portfolio allocation from a static snapshot.

use crate::domain::cleaning::{UNCLASSIFIED, YieldScale};
use crate::domain::currency::{ExchangeRates, currency_for_ticker};
use crate::ports::allocation_port::AllocationPort;
use serde::Serialize;
use std::collections::BTreeMap;

pub const DEFAULT_INITIAL_INVESTMENT: f64 = 1_000_000.0;
pub const DEFAULT_SHARE_DECIMALS: u32 = 2;

/// One constituent as supplied by the allocation snapshot provider, priced
/// in its listing currency at allocation time.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationSource {
    pub ticker: String,
    pub initial_price: f64,
    pub sector: Option<String>,
    pub country: Option<String>,
    /// In the provider's declared scale.
    pub dividend_yield: Option<f64>,
    pub beta: Option<f64>,
}

impl AllocationSource {
    pub fn new(ticker: &str, initial_price: f64) -> Self {
        Self {
            ticker: ticker.to_string(),
            initial_price,
            sector: None,
            country: None,
            dividend_yield: None,
            beta: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllocationConfig {
    pub initial_investment: f64,
    pub share_decimals: u32,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            initial_investment: DEFAULT_INITIAL_INVESTMENT,
            share_decimals: DEFAULT_SHARE_DECIMALS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationEntry {
    pub ticker: String,
    pub weight: f64,
    pub initial_price: f64,
    pub currency: String,
    pub exchange_rate: f64,
    pub target_value: f64,
    pub shares: f64,
    pub initial_position_value: f64,
    pub sector: String,
    pub country: String,
    /// Percent-scaled.
    pub dividend_yield: Option<f64>,
    pub beta: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub initial_investment: f64,
    pub entries: Vec<AllocationEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationSlice {
    pub label: String,
    pub value: f64,
}

impl Allocation {
    pub fn empty(initial_investment: f64) -> Self {
        Self {
            initial_investment,
            entries: Vec::new(),
        }
    }

    /// Splits the investment equally across `sources`. Currencies come from
    /// the ticker suffix; a currency missing from `rates` converts at 1.0.
    /// Share counts are rounded to `share_decimals`, so position values
    /// only approximate the target.
    pub fn equal_weight(
        sources: &[AllocationSource],
        config: &AllocationConfig,
        rates: &ExchangeRates,
        yield_scale: YieldScale,
    ) -> Self {
        if sources.is_empty() {
            return Self::empty(config.initial_investment);
        }

        let weight = 1.0 / sources.len() as f64;
        let target_value = config.initial_investment * weight;

        let entries = sources
            .iter()
            .map(|src| {
                let currency = currency_for_ticker(&src.ticker);
                let exchange_rate = rates.rate(currency).unwrap_or_else(|| {
                    tracing::warn!(ticker = %src.ticker, currency, "no exchange rate, using 1.0");
                    1.0
                });

                let unit_value = src.initial_price * exchange_rate;
                let shares = if unit_value.is_finite() && unit_value > 0.0 {
                    round_to(target_value / unit_value, config.share_decimals)
                } else {
                    tracing::warn!(ticker = %src.ticker, price = src.initial_price, "unusable initial price, holding no shares");
                    0.0
                };

                AllocationEntry {
                    ticker: src.ticker.trim().to_string(),
                    weight,
                    initial_price: src.initial_price,
                    currency: currency.to_string(),
                    exchange_rate,
                    target_value,
                    shares,
                    initial_position_value: shares * src.initial_price * exchange_rate,
                    sector: label_or_unclassified(src.sector.as_deref()),
                    country: label_or_unclassified(src.country.as_deref()),
                    dividend_yield: src.dividend_yield.map(|v| yield_scale.to_percent(v)),
                    beta: src.beta.filter(|b| b.is_finite()),
                }
            })
            .collect();

        Self {
            initial_investment: config.initial_investment,
            entries,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|e| e.weight).sum()
    }

    pub fn total_initial_value(&self) -> f64 {
        self.entries.iter().map(|e| e.initial_position_value).sum()
    }

    /// Mean percent yield over the constituents that report one.
    pub fn average_yield(&self) -> Option<f64> {
        let yields: Vec<f64> = self
            .entries
            .iter()
            .filter_map(|e| e.dividend_yield)
            .filter(|y| y.is_finite())
            .collect();
        if yields.is_empty() {
            return None;
        }
        Some(yields.iter().sum::<f64>() / yields.len() as f64)
    }

    /// Sum of `beta * weight` over the constituents with a beta. Constituents
    /// without one contribute nothing, so a partial list understates the total.
    pub fn weighted_beta(&self) -> Option<f64> {
        let mut betas = self
            .entries
            .iter()
            .filter_map(|e| e.beta.map(|b| b * e.weight))
            .peekable();
        betas.peek()?;
        Some(betas.sum())
    }

    pub fn by_sector(&self) -> Vec<AllocationSlice> {
        self.group_by(|e| &e.sector)
    }

    pub fn by_country(&self) -> Vec<AllocationSlice> {
        self.group_by(|e| &e.country)
    }

    fn group_by(&self, key: impl Fn(&AllocationEntry) -> &String) -> Vec<AllocationSlice> {
        let mut groups: BTreeMap<&str, f64> = BTreeMap::new();
        for entry in &self.entries {
            *groups.entry(key(entry).as_str()).or_default() += entry.initial_position_value;
        }
        groups
            .into_iter()
            .map(|(label, value)| AllocationSlice {
                label: label.to_string(),
                value,
            })
            .collect()
    }
}

/// Loads the snapshot and builds the allocation. A provider failure yields
/// an empty allocation.
pub fn load_allocation(
    port: &dyn AllocationPort,
    config: &AllocationConfig,
    rates: &ExchangeRates,
) -> Allocation {
    match port.load_allocation() {
        Ok(sources) => {
            let allocation = Allocation::equal_weight(&sources, config, rates, port.yield_scale());
            tracing::info!(
                constituents = allocation.len(),
                invested = allocation.total_initial_value(),
                "allocation built"
            );
            allocation
        }
        Err(e) => {
            tracing::warn!(error = %e, "allocation snapshot unavailable, using empty allocation");
            Allocation::empty(config.initial_investment)
        }
    }
}

fn label_or_unclassified(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => UNCLASSIFIED.to_string(),
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
