//! Min-max normalization and the PER / dividend-yield composite score.

pub const PER_BOUNDS: (f64, f64) = (0.0, 100.0);
pub const YIELD_BOUNDS: (f64, f64) = (0.0, 15.0);
pub const PER_WEIGHT: f64 = 0.4;
pub const YIELD_WEIGHT: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreComponents {
    pub per_norm: f64,
    pub yield_norm: f64,
    pub score: f64,
}

/// Scales a column to [0, 100]. A constant (or empty) column maps to all
/// zeros, with or without `reverse`.
pub fn normalize_metric(values: &[f64], reverse: bool) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if values.is_empty() || max == min {
        return vec![0.0; values.len()];
    }

    let range = max - min;
    values
        .iter()
        .map(|&v| {
            let normalized = 100.0 * (v - min) / range;
            if reverse { 100.0 - normalized } else { normalized }
        })
        .collect()
}

pub fn clip(value: f64, (lower, upper): (f64, f64)) -> f64 {
    value.max(lower).min(upper)
}

/// Scores a whole table column-wise: cheaper PER and higher yield both rank
/// higher. Yields must already be percent-scaled.
pub fn compute_scores(trailing_pe: &[f64], dividend_yield: &[f64]) -> Vec<ScoreComponents> {
    debug_assert_eq!(trailing_pe.len(), dividend_yield.len());

    let per_clipped: Vec<f64> = trailing_pe.iter().map(|&v| clip(v, PER_BOUNDS)).collect();
    let yield_clipped: Vec<f64> = dividend_yield
        .iter()
        .map(|&v| clip(v, YIELD_BOUNDS))
        .collect();

    let per_norm = normalize_metric(&per_clipped, true);
    let yield_norm = normalize_metric(&yield_clipped, false);

    per_norm
        .into_iter()
        .zip(yield_norm)
        .map(|(per_norm, yield_norm)| ScoreComponents {
            per_norm,
            yield_norm,
            score: PER_WEIGHT * per_norm + YIELD_WEIGHT * yield_norm,
        })
        .collect()
}
