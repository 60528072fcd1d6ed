//! Aggregate views over a prepared market table: filtering, headline
//! figures, highlights and per-sector averages.

use crate::domain::instrument::MarketRow;
use crate::domain::market_data::CleanedMarketTable;
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub const HIGHLIGHT_COUNT: usize = 5;

/// Row filter. Unset criteria and empty sets match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketFilter {
    pub sectors: Vec<String>,
    pub countries: Vec<String>,
    pub min_market_cap: Option<f64>,
    pub max_market_cap: Option<f64>,
    pub per_range: Option<(f64, f64)>,
    /// Percent-scaled bounds, matching the prepared table.
    pub yield_range: Option<(f64, f64)>,
}

impl MarketFilter {
    pub fn matches(&self, row: &MarketRow) -> bool {
        if !self.sectors.is_empty() && !self.sectors.iter().any(|s| s == &row.sector) {
            return false;
        }
        if !self.countries.is_empty() && !self.countries.iter().any(|c| c == &row.country) {
            return false;
        }
        if self.min_market_cap.is_some_and(|min| row.market_cap < min) {
            return false;
        }
        if self.max_market_cap.is_some_and(|max| row.market_cap > max) {
            return false;
        }
        if let Some((lo, hi)) = self.per_range
            && (row.trailing_pe < lo || row.trailing_pe > hi)
        {
            return false;
        }
        if let Some((lo, hi)) = self.yield_range
            && (row.dividend_yield < lo || row.dividend_yield > hi)
        {
            return false;
        }
        true
    }

    pub fn apply(&self, table: &CleanedMarketTable) -> CleanedMarketTable {
        CleanedMarketTable {
            rows: table
                .rows
                .iter()
                .filter(|row| self.matches(row))
                .cloned()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketSummary {
    pub companies: usize,
    pub total_market_cap: f64,
    pub avg_per: f64,
    pub avg_yield: f64,
    pub avg_week52_change: f64,
}

impl MarketSummary {
    pub fn compute(rows: &[MarketRow]) -> Self {
        if rows.is_empty() {
            return Self::default();
        }
        Self {
            companies: rows.len(),
            total_market_cap: rows.iter().map(|r| r.market_cap).sum(),
            avg_per: mean(rows.iter().map(|r| r.trailing_pe)),
            avg_yield: mean(rows.iter().map(|r| r.dividend_yield)),
            avg_week52_change: mean(rows.iter().map(|r| r.week52_change)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub ticker: String,
    pub full_name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectorShare {
    pub sector: String,
    /// Share of total market cap, percent rounded to two decimals.
    pub percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketHighlights {
    pub best_performers: Vec<Highlight>,
    pub worst_performers: Vec<Highlight>,
    pub highest_dividends: Vec<Highlight>,
    pub sector_allocation: Vec<SectorShare>,
}

impl MarketHighlights {
    pub fn compute(rows: &[MarketRow]) -> Self {
        Self {
            best_performers: top_by(rows, |r| r.week52_change, true),
            worst_performers: top_by(rows, |r| r.week52_change, false),
            highest_dividends: top_by(rows, |r| r.dividend_yield, true),
            sector_allocation: sector_allocation(rows),
        }
    }
}

fn top_by(rows: &[MarketRow], key: impl Fn(&MarketRow) -> f64, descending: bool) -> Vec<Highlight> {
    let mut ranked: Vec<&MarketRow> = rows.iter().collect();
    ranked.sort_by(|a, b| {
        let ord = key(a).partial_cmp(&key(b)).unwrap_or(Ordering::Equal);
        if descending { ord.reverse() } else { ord }
    });
    ranked
        .into_iter()
        .take(HIGHLIGHT_COUNT)
        .map(|r| Highlight {
            ticker: r.ticker.clone(),
            full_name: r.full_name.clone(),
            value: key(r),
        })
        .collect()
}

pub fn sector_allocation(rows: &[MarketRow]) -> Vec<SectorShare> {
    let total: f64 = rows.iter().map(|r| r.market_cap).sum();
    if total <= 0.0 {
        return Vec::new();
    }

    let mut by_sector: BTreeMap<&str, f64> = BTreeMap::new();
    for row in rows {
        *by_sector.entry(row.sector.as_str()).or_default() += row.market_cap;
    }

    let mut shares: Vec<SectorShare> = by_sector
        .into_iter()
        .map(|(sector, cap)| SectorShare {
            sector: sector.to_string(),
            percent: round2(cap / total * 100.0),
        })
        .collect();
    shares.sort_by(|a, b| b.percent.partial_cmp(&a.percent).unwrap_or(Ordering::Equal));
    shares
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectorMetrics {
    pub sector: String,
    pub companies: usize,
    pub avg_per: f64,
    pub avg_yield: f64,
    pub avg_market_cap: f64,
    pub avg_score: f64,
}

impl SectorMetrics {
    /// One entry per sector, alphabetical.
    pub fn compute(rows: &[MarketRow]) -> Vec<SectorMetrics> {
        let mut groups: BTreeMap<&str, Vec<&MarketRow>> = BTreeMap::new();
        for row in rows {
            groups.entry(row.sector.as_str()).or_default().push(row);
        }

        groups
            .into_iter()
            .map(|(sector, members)| SectorMetrics {
                sector: sector.to_string(),
                companies: members.len(),
                avg_per: round2(mean(members.iter().map(|r| r.trailing_pe))),
                avg_yield: round2(mean(members.iter().map(|r| r.dividend_yield))),
                avg_market_cap: round2(mean(members.iter().map(|r| r.market_cap))),
                avg_score: round2(mean(members.iter().map(|r| r.score))),
            })
            .collect()
    }
}

pub(crate) fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
