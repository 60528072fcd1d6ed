//! Performance metrics over the aggregate value series, and performer
//! rankings.

use super::portfolio::PortfolioValueSeries;
use std::cmp::Ordering;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const RANKING_SIZE: usize = 5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceMetrics {
    pub initial_value: f64,
    pub final_value: f64,
    /// Percent change from the first to the last point.
    pub total_variation: f64,
    /// Sample standard deviation of daily returns, annualized, in percent.
    pub annualized_volatility: f64,
    /// Worst peak-to-trough decline in percent; zero or negative.
    pub max_drawdown: f64,
}

impl PerformanceMetrics {
    pub fn compute(series: &PortfolioValueSeries) -> Self {
        let values = series.values();
        let (Some(&initial_value), Some(&final_value)) = (values.first(), values.last()) else {
            return Self::default();
        };

        let total_variation = if initial_value > 0.0 {
            (final_value / initial_value - 1.0) * 100.0
        } else {
            0.0
        };

        let returns = daily_returns(&values);
        let annualized_volatility = sample_stddev(&returns)
            .map(|sd| sd * TRADING_DAYS_PER_YEAR.sqrt() * 100.0)
            .unwrap_or(0.0);

        PerformanceMetrics {
            initial_value,
            final_value,
            total_variation,
            annualized_volatility,
            max_drawdown: compute_max_drawdown(&values),
        }
    }
}

/// Day-over-day fractional change; steps from a non-positive value are
/// skipped.
pub fn daily_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

/// Sample (n - 1) standard deviation; `None` below two observations.
pub fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

fn compute_max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;

    for &v in values {
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            let dd = (v - peak) / peak * 100.0;
            if dd < worst {
                worst = dd;
            }
        }
    }

    worst
}

#[derive(Debug, Clone, PartialEq)]
pub struct Performer {
    pub ticker: String,
    pub variation: f64,
    pub current_value: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformerRanking {
    /// Best first.
    pub top: Vec<Performer>,
    /// Worst first.
    pub bottom: Vec<Performer>,
}

impl PerformerRanking {
    pub fn compute(performers: &[Performer]) -> Self {
        let mut sorted: Vec<Performer> = performers.to_vec();
        sorted.sort_by(|a, b| {
            b.variation
                .partial_cmp(&a.variation)
                .unwrap_or(Ordering::Equal)
        });

        let top = sorted.iter().take(RANKING_SIZE).cloned().collect();
        let bottom = sorted.iter().rev().take(RANKING_SIZE).cloned().collect();
        Self { top, bottom }
    }
}
