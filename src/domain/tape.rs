//! Ticker tape: daily change of a fixed watch list, cached per session.

use super::price_series::clean_window;
use super::session_cache::SessionCache;
use crate::ports::price_port::PricePort;
use chrono::{Duration, NaiveDate};
use serde::Serialize;

/// Calendar days fetched to be sure two trading closes are covered.
pub const TAPE_LOOKBACK_DAYS: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapeEntry {
    pub label: String,
    pub ticker: String,
}

impl TapeEntry {
    pub fn new(label: &str, ticker: &str) -> Self {
        Self {
            label: label.to_string(),
            ticker: ticker.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TapeQuote {
    pub label: String,
    pub ticker: String,
    pub last_close: f64,
    /// Percent change between the last two closes.
    pub change_pct: f64,
}

impl TapeQuote {
    pub fn is_up(&self) -> bool {
        self.change_pct >= 0.0
    }
}

pub struct TapeService {
    entries: Vec<TapeEntry>,
    cache: SessionCache<Vec<TapeQuote>>,
}

impl TapeService {
    pub fn new(entries: Vec<TapeEntry>, cache: SessionCache<Vec<TapeQuote>>) -> Self {
        Self { entries, cache }
    }

    pub fn entries(&self) -> &[TapeEntry] {
        &self.entries
    }

    /// Quotes for `scope`, computed on the first call and then served from
    /// the cache until it expires.
    pub fn quotes(&self, scope: &str, prices: &dyn PricePort, today: NaiveDate) -> Vec<TapeQuote> {
        self.cache
            .get_or_insert_with(scope, || compute_quotes(&self.entries, prices, today))
    }

    pub fn refresh(&self, scope: &str) {
        self.cache.invalidate(scope);
    }
}

/// Entries whose fetch fails or that have fewer than two closes are
/// skipped.
pub fn compute_quotes(entries: &[TapeEntry], prices: &dyn PricePort, today: NaiveDate) -> Vec<TapeQuote> {
    let start = today - Duration::days(TAPE_LOOKBACK_DAYS);
    let quotes: Vec<TapeQuote> = entries
        .iter()
        .filter_map(|entry| {
            let points = match prices.fetch_closes(&entry.ticker, start, today) {
                Ok(points) => clean_window(points, start, today),
                Err(e) => {
                    tracing::debug!(ticker = %entry.ticker, error = %e, "tape entry skipped");
                    return None;
                }
            };
            let [.., prev, last] = points.as_slice() else {
                return None;
            };
            Some(TapeQuote {
                label: entry.label.clone(),
                ticker: entry.ticker.clone(),
                last_close: last.close,
                change_pct: (last.close - prev.close) / prev.close * 100.0,
            })
        })
        .collect();

    tracing::debug!(requested = entries.len(), quoted = quotes.len(), "tape computed");
    quotes
}
