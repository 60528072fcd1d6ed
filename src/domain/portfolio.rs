//! Aggregate portfolio value series.

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValuePoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioValueSeries {
    pub points: Vec<ValuePoint>,
}

impl PortfolioValueSeries {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn from_parts(dates: &[NaiveDate], values: &[f64]) -> Self {
        debug_assert_eq!(dates.len(), values.len());
        Self {
            points: dates
                .iter()
                .zip(values)
                .map(|(&date, &value)| ValuePoint { date, value })
                .collect(),
        }
    }

    pub fn record(&mut self, date: NaiveDate, value: f64) {
        self.points.push(ValuePoint { date, value });
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&ValuePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&ValuePoint> {
        self.points.last()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Percent change of each point relative to the first one.
    pub fn cumulative_performance(&self) -> Vec<ValuePoint> {
        let Some(base) = self.first().map(|p| p.value).filter(|v| *v > 0.0) else {
            return self
                .points
                .iter()
                .map(|p| ValuePoint {
                    date: p.date,
                    value: 0.0,
                })
                .collect();
        };
        self.points
            .iter()
            .map(|p| ValuePoint {
                date: p.date,
                value: (p.value / base - 1.0) * 100.0,
            })
            .collect()
    }
}
