//! Qualitative labels for a single instrument and its sector comparison.

use crate::domain::instrument::MarketRow;
use crate::domain::market_analytics::mean;
use crate::domain::market_data::CleanedMarketTable;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Momentum {
    Strong,
    Neutral,
    Weak,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Valuation {
    Attractive,
    Fair,
    Expensive,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Unavailable,
}

impl Momentum {
    /// From the 52-week change, in percent.
    pub fn from_change(change: Option<f64>) -> Self {
        match change {
            None => Momentum::Unavailable,
            Some(c) if c > 20.0 => Momentum::Strong,
            Some(c) if c < -20.0 => Momentum::Weak,
            Some(_) => Momentum::Neutral,
        }
    }
}

impl Valuation {
    pub fn from_per(per: Option<f64>) -> Self {
        match per {
            None => Valuation::Unavailable,
            Some(p) if p < 15.0 => Valuation::Attractive,
            Some(p) if p > 30.0 => Valuation::Expensive,
            Some(_) => Valuation::Fair,
        }
    }
}

impl RiskLevel {
    pub fn from_beta(beta: Option<f64>) -> Self {
        match beta {
            None => RiskLevel::Unavailable,
            Some(b) if b < 0.8 => RiskLevel::Low,
            Some(b) if b > 1.2 => RiskLevel::High,
            Some(_) => RiskLevel::Medium,
        }
    }
}

impl fmt::Display for Momentum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Momentum::Strong => "strong",
            Momentum::Neutral => "neutral",
            Momentum::Weak => "weak",
            Momentum::Unavailable => "n/a",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for Valuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Valuation::Attractive => "attractive",
            Valuation::Fair => "fair",
            Valuation::Expensive => "expensive",
            Valuation::Unavailable => "n/a",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Unavailable => "n/a",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectorComparison {
    pub sector: String,
    pub peers: usize,
    pub avg_per: f64,
    pub avg_beta: Option<f64>,
    pub avg_yield: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StockAssessment {
    pub ticker: String,
    pub full_name: String,
    pub momentum: Momentum,
    pub valuation: Valuation,
    pub risk: RiskLevel,
    pub sector: SectorComparison,
}

/// Assesses `ticker` against the rest of its sector in `table`.
///
/// A zero PER or 52-week change in a prepared row is indistinguishable from
/// a missing cell, so zero is reported as unavailable.
pub fn assess(table: &CleanedMarketTable, ticker: &str) -> Option<StockAssessment> {
    let row = table.find(ticker)?;
    let peers: Vec<&MarketRow> = table.rows.iter().filter(|r| r.sector == row.sector).collect();
    let betas: Vec<f64> = peers.iter().filter_map(|r| r.beta).collect();

    Some(StockAssessment {
        ticker: row.ticker.clone(),
        full_name: row.full_name.clone(),
        momentum: Momentum::from_change(non_zero(row.week52_change)),
        valuation: Valuation::from_per(non_zero(row.trailing_pe)),
        risk: RiskLevel::from_beta(row.beta),
        sector: SectorComparison {
            sector: row.sector.clone(),
            peers: peers.len(),
            avg_per: mean(peers.iter().map(|r| r.trailing_pe)),
            avg_beta: if betas.is_empty() {
                None
            } else {
                Some(mean(betas.into_iter()))
            },
            avg_yield: mean(peers.iter().map(|r| r.dividend_yield)),
        },
    })
}

fn non_zero(value: f64) -> Option<f64> {
    if value == 0.0 { None } else { Some(value) }
}
