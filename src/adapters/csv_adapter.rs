//! CSV file adapters: snapshot, allocation and price readers, plus writers
//! for the prepared table and the backtest value series.

use crate::domain::allocation::AllocationSource;
use crate::domain::cleaning::{YieldScale, coerce_numeric, coerce_optional};
use crate::domain::error::MarketLensError;
use crate::domain::instrument::InstrumentRecord;
use crate::domain::market_data::CleanedMarketTable;
use crate::domain::portfolio::PortfolioValueSeries;
use crate::domain::price_series::PricePoint;
use crate::ports::allocation_port::AllocationPort;
use crate::ports::price_port::PricePort;
use crate::ports::snapshot_port::SnapshotPort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

fn read_source(path: &Path) -> Result<String, MarketLensError> {
    fs::read_to_string(path)
        .map_err(|e| MarketLensError::unavailable(format!("failed to read {}: {}", path.display(), e)))
}

/// Logs a row that failed to deserialize and drops it.
fn skip_bad_row<T>(path: &Path, result: Result<T, csv::Error>) -> Option<T> {
    match result {
        Ok(row) => Some(row),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "skipping malformed row");
            None
        }
    }
}

fn parse_error(path: &Path, err: csv::Error) -> MarketLensError {
    MarketLensError::SourceParse {
        source_name: path.display().to_string(),
        reason: err.to_string(),
    }
}

/// Reads the market snapshot export (`stocks_data.csv` layout).
pub struct CsvSnapshotAdapter {
    path: PathBuf,
    yield_scale: YieldScale,
}

impl CsvSnapshotAdapter {
    pub fn new(path: PathBuf, yield_scale: YieldScale) -> Self {
        Self { path, yield_scale }
    }
}

impl SnapshotPort for CsvSnapshotAdapter {
    fn load_snapshot(&self) -> Result<Vec<InstrumentRecord>, MarketLensError> {
        let content = read_source(&self.path)?;
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut records = Vec::new();
        for result in rdr.deserialize::<InstrumentRecord>() {
            let Some(record) = skip_bad_row(&self.path, result) else {
                continue;
            };
            if record.ticker.trim().is_empty() {
                tracing::debug!(path = %self.path.display(), "skipping snapshot row without ticker");
                continue;
            }
            records.push(record);
        }

        tracing::debug!(path = %self.path.display(), rows = records.len(), "snapshot read");
        Ok(records)
    }

    fn yield_scale(&self) -> YieldScale {
        self.yield_scale
    }
}

#[derive(Debug, Deserialize)]
struct AllocationRow {
    #[serde(alias = "Ticker")]
    ticker: String,
    #[serde(alias = "Prix actuel", alias = "Prix_actuel")]
    price: Option<String>,
    #[serde(alias = "Secteur")]
    sector: Option<String>,
    #[serde(alias = "Pays")]
    country: Option<String>,
    #[serde(alias = "Rendement du dividende", alias = "Rendement_du_dividende")]
    dividend_yield: Option<String>,
    #[serde(alias = "Beta")]
    beta: Option<String>,
}

/// Reads the selected constituents (`selected_stocks.csv` layout).
pub struct CsvAllocationAdapter {
    path: PathBuf,
    yield_scale: YieldScale,
}

impl CsvAllocationAdapter {
    pub fn new(path: PathBuf, yield_scale: YieldScale) -> Self {
        Self { path, yield_scale }
    }
}

impl AllocationPort for CsvAllocationAdapter {
    fn load_allocation(&self) -> Result<Vec<AllocationSource>, MarketLensError> {
        let content = read_source(&self.path)?;
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut sources = Vec::new();
        for result in rdr.deserialize::<AllocationRow>() {
            let Some(row) = skip_bad_row(&self.path, result) else {
                continue;
            };
            let ticker = row.ticker.trim();
            if ticker.is_empty() {
                continue;
            }
            sources.push(AllocationSource {
                ticker: ticker.to_string(),
                initial_price: coerce_numeric(row.price.as_deref(), 0.0),
                sector: row.sector,
                country: row.country,
                dividend_yield: coerce_optional(row.dividend_yield.as_deref()),
                beta: coerce_optional(row.beta.as_deref()),
            });
        }
        Ok(sources)
    }

    fn yield_scale(&self) -> YieldScale {
        self.yield_scale
    }
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    #[serde(alias = "Date")]
    date: String,
    #[serde(alias = "Close")]
    close: Option<String>,
}

/// Reads one `<TICKER>.csv` file with `date,close` columns per ticker.
pub struct CsvPriceAdapter {
    base_path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{ticker}.csv"))
    }
}

impl PricePort for CsvPriceAdapter {
    fn fetch_closes(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, MarketLensError> {
        let path = self.csv_path(ticker);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => MarketLensError::NoData {
                ticker: ticker.to_string(),
            },
            _ => MarketLensError::Source {
                reason: format!("failed to read {}: {}", path.display(), e),
            },
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());
        let mut points = Vec::new();

        for result in rdr.deserialize::<PriceRow>() {
            let Some(row) = skip_bad_row(&path, result) else {
                continue;
            };
            // Timestamps such as `2024-01-02 00:00:00+01:00` keep their date part.
            let date_part = row.date.get(..10).unwrap_or(&row.date);
            let date = match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
                Ok(date) => date,
                Err(e) => {
                    tracing::warn!(path = %path.display(), date = %row.date, error = %e, "skipping row with invalid date");
                    continue;
                }
            };

            if date < start_date || date > end_date {
                continue;
            }
            if let Some(close) = coerce_optional(row.close.as_deref()) {
                points.push(PricePoint::new(date, close));
            }
        }

        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}

/// Writes the prepared market table with a header row.
pub fn write_market_table(path: &Path, table: &CleanedMarketTable) -> Result<(), MarketLensError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| parse_error(path, e))?;
    for row in &table.rows {
        wtr.serialize(row).map_err(|e| parse_error(path, e))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the aggregate value series as `date,value`.
pub fn write_value_series(path: &Path, series: &PortfolioValueSeries) -> Result<(), MarketLensError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| parse_error(path, e))?;
    for point in &series.points {
        wtr.serialize(point).map_err(|e| parse_error(path, e))?;
    }
    wtr.flush()?;
    Ok(())
}
