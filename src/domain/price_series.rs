//! Daily close series, the shared date index, and gap filling.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Keeps the points inside `[start, end]` with a finite, positive close,
/// sorted by date. Later duplicates of a date replace earlier ones.
pub fn clean_window(points: Vec<PricePoint>, start: NaiveDate, end: NaiveDate) -> Vec<PricePoint> {
    let mut by_date: HashMap<NaiveDate, f64> = HashMap::new();
    for p in points {
        if p.date >= start && p.date <= end && p.close.is_finite() && p.close > 0.0 {
            by_date.insert(p.date, p.close);
        }
    }
    let mut cleaned: Vec<PricePoint> = by_date
        .into_iter()
        .map(|(date, close)| PricePoint { date, close })
        .collect();
    cleaned.sort_by_key(|p| p.date);
    cleaned
}

/// Union of all dates across `series`, ascending.
pub fn build_date_index<'a>(series: impl IntoIterator<Item = &'a [(NaiveDate, f64)]>) -> Vec<NaiveDate> {
    let unique: BTreeSet<NaiveDate> = series
        .into_iter()
        .flat_map(|s| s.iter().map(|(date, _)| *date))
        .collect();
    unique.into_iter().collect()
}

/// Places `series` on `index`; dates the series does not cover are `None`.
pub fn align(series: &[(NaiveDate, f64)], index: &[NaiveDate]) -> Vec<Option<f64>> {
    let lookup: HashMap<NaiveDate, f64> = series.iter().copied().collect();
    index.iter().map(|d| lookup.get(d).copied()).collect()
}

/// Two-pass fill: every gap first takes the next observation (backward
/// pass), then the trailing gap repeats the last one (forward pass).
/// Returns `None` when there is no observation at all.
pub fn fill_gaps(values: &[Option<f64>]) -> Option<Vec<f64>> {
    values.iter().flatten().next()?;
    let mut filled: Vec<Option<f64>> = values.to_vec();

    let mut next = None;
    for v in filled.iter_mut().rev() {
        match v {
            Some(value) => next = Some(*value),
            None => *v = next,
        }
    }

    let mut last = None;
    for v in filled.iter_mut() {
        match v {
            Some(value) => last = Some(*value),
            None => *v = last,
        }
    }

    filled.into_iter().collect()
}
