#![allow(dead_code)]

use chrono::NaiveDate;
use marketlens::domain::allocation::AllocationSource;
use marketlens::domain::cleaning::YieldScale;
use marketlens::domain::error::MarketLensError;
use marketlens::domain::instrument::InstrumentRecord;
use marketlens::domain::price_series::PricePoint;
use marketlens::ports::allocation_port::AllocationPort;
use marketlens::ports::price_port::PricePort;
use marketlens::ports::snapshot_port::SnapshotPort;
use std::collections::HashMap;
use std::io::Write;

pub struct MockPricePort {
    pub data: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
}

impl MockPricePort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, ticker: &str, points: Vec<PricePoint>) -> Self {
        self.data.insert(ticker.to_string(), points);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl PricePort for MockPricePort {
    fn fetch_closes(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, MarketLensError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(MarketLensError::Source {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(ticker)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| p.date >= start_date && p.date <= end_date)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }
}

pub struct MockSnapshotPort {
    pub records: Result<Vec<InstrumentRecord>, String>,
    pub yield_scale: YieldScale,
}

impl MockSnapshotPort {
    pub fn new(records: Vec<InstrumentRecord>) -> Self {
        Self {
            records: Ok(records),
            yield_scale: YieldScale::Percent,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            records: Err(reason.to_string()),
            yield_scale: YieldScale::Percent,
        }
    }

    pub fn with_yield_scale(mut self, scale: YieldScale) -> Self {
        self.yield_scale = scale;
        self
    }
}

impl SnapshotPort for MockSnapshotPort {
    fn load_snapshot(&self) -> Result<Vec<InstrumentRecord>, MarketLensError> {
        self.records.clone().map_err(|reason| MarketLensError::Source { reason })
    }

    fn yield_scale(&self) -> YieldScale {
        self.yield_scale
    }
}

pub struct MockAllocationPort {
    pub sources: Result<Vec<AllocationSource>, String>,
}

impl MockAllocationPort {
    pub fn new(sources: Vec<AllocationSource>) -> Self {
        Self { sources: Ok(sources) }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            sources: Err(reason.to_string()),
        }
    }
}

impl AllocationPort for MockAllocationPort {
    fn load_allocation(&self) -> Result<Vec<AllocationSource>, MarketLensError> {
        self.sources.clone().map_err(|reason| MarketLensError::Source { reason })
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Closes on consecutive calendar days starting at `start`.
pub fn daily_closes(start: NaiveDate, closes: &[f64]) -> Vec<PricePoint> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PricePoint::new(start + chrono::Duration::days(i as i64), close))
        .collect()
}

pub fn record(ticker: &str, market_cap: &str, pe: &str, dividend_yield: &str) -> InstrumentRecord {
    InstrumentRecord {
        market_cap: Some(market_cap.to_string()),
        trailing_pe: Some(pe.to_string()),
        dividend_yield: Some(dividend_yield.to_string()),
        sector: Some("Technology".to_string()),
        country: Some("France".to_string()),
        ..InstrumentRecord::new(ticker)
    }
}

pub fn write_file(dir: &std::path::Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}
