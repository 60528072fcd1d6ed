//! SQLite data adapter: the `stock_data` snapshot table and the
//! `price_history` close table.

use crate::domain::cleaning::{YieldScale, coerce_optional};
use crate::domain::config_validation::{required_string, yield_scale};
use crate::domain::error::MarketLensError;
use crate::domain::instrument::InstrumentRecord;
use crate::domain::price_series::PricePoint;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PricePort;
use crate::ports::snapshot_port::SnapshotPort;
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use rusqlite::types::Value;

/// Snapshot columns in `InstrumentRecord` field order.
const SNAPSHOT_COLUMNS: [&str; 13] = [
    "Ticker",
    "Nom_complet",
    "Secteur",
    "Industrie",
    "Pays",
    "Devise",
    "Prix_actuel",
    "Capitalisation_boursiere",
    "Volume",
    "PER_historique",
    "Rendement_du_dividende",
    "Variation_52_semaines",
    "Beta",
];

fn db_error(e: impl std::fmt::Display) -> MarketLensError {
    MarketLensError::Source {
        reason: format!("sqlite: {e}"),
    }
}

/// Renders any SQLite cell as text; NULL and blobs are absent.
fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null | Value::Blob(_) => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Text(s) => Some(s),
    }
}

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
    yield_scale: YieldScale,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, MarketLensError> {
        let db_path = required_string(config, "data", "sqlite_path")?;
        let pool_size = config.get_int("data", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(db_error)?;

        Ok(Self {
            pool,
            yield_scale: yield_scale(config, "data", "snapshot_yield_scale")?,
        })
    }

    pub fn in_memory(yield_scale: YieldScale) -> Result<Self, MarketLensError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(db_error)?;
        Ok(Self { pool, yield_scale })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, MarketLensError> {
        self.pool.get().map_err(db_error)
    }

    /// Snapshot columns are declared without a type so the vendor export
    /// can land as-is; every cell is read back as text.
    pub fn initialize_schema(&self) -> Result<(), MarketLensError> {
        let conn = self.conn()?;
        let columns = SNAPSHOT_COLUMNS.join(",\n                ");
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS stock_data (
                id INTEGER PRIMARY KEY,
                {columns}
            );
            CREATE TABLE IF NOT EXISTS price_history (
                ticker TEXT NOT NULL,
                date TEXT NOT NULL,
                close REAL,
                PRIMARY KEY (ticker, date)
            );
            CREATE INDEX IF NOT EXISTS idx_price_history_date ON price_history(date);"
        ))
        .map_err(db_error)?;
        Ok(())
    }

    pub fn insert_records(&self, records: &[InstrumentRecord]) -> Result<(), MarketLensError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_error)?;
        let placeholders: Vec<String> = (1..=SNAPSHOT_COLUMNS.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO stock_data ({}) VALUES ({})",
            SNAPSHOT_COLUMNS.join(", "),
            placeholders.join(", ")
        );

        for r in records {
            tx.execute(
                &sql,
                params![
                    r.ticker,
                    r.full_name,
                    r.sector,
                    r.industry,
                    r.country,
                    r.currency,
                    r.price,
                    r.market_cap,
                    r.volume,
                    r.trailing_pe,
                    r.dividend_yield,
                    r.week52_change,
                    r.beta
                ],
            )
            .map_err(db_error)?;
        }

        tx.commit().map_err(db_error)?;
        Ok(())
    }

    pub fn insert_prices(&self, ticker: &str, points: &[PricePoint]) -> Result<(), MarketLensError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_error)?;
        for p in points {
            tx.execute(
                "INSERT OR REPLACE INTO price_history (ticker, date, close) VALUES (?1, ?2, ?3)",
                params![ticker, p.date.format("%Y-%m-%d").to_string(), p.close],
            )
            .map_err(db_error)?;
        }
        tx.commit().map_err(db_error)?;
        Ok(())
    }
}

impl SnapshotPort for SqliteAdapter {
    fn load_snapshot(&self) -> Result<Vec<InstrumentRecord>, MarketLensError> {
        let conn = self.conn()?;
        let query = format!("SELECT {} FROM stock_data ORDER BY id", SNAPSHOT_COLUMNS.join(", "));
        let mut stmt = conn.prepare(&query).map_err(db_error)?;

        let rows = stmt
            .query_map([], |row| {
                let mut cells = Vec::with_capacity(SNAPSHOT_COLUMNS.len());
                for i in 0..SNAPSHOT_COLUMNS.len() {
                    cells.push(value_to_text(row.get::<_, Value>(i)?));
                }
                Ok(cells)
            })
            .map_err(db_error)?;

        let mut records = Vec::new();
        for row in rows {
            let mut cells = row.map_err(db_error)?.into_iter();
            let mut next = || cells.next().flatten();
            let Some(ticker) = next().filter(|t| !t.trim().is_empty()) else {
                continue;
            };
            records.push(InstrumentRecord {
                ticker,
                full_name: next(),
                sector: next(),
                industry: next(),
                country: next(),
                currency: next(),
                price: next(),
                market_cap: next(),
                volume: next(),
                trailing_pe: next(),
                dividend_yield: next(),
                week52_change: next(),
                beta: next(),
            });
        }

        tracing::debug!(rows = records.len(), "stock_data read");
        Ok(records)
    }

    fn yield_scale(&self) -> YieldScale {
        self.yield_scale
    }
}

impl PricePort for SqliteAdapter {
    fn fetch_closes(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, MarketLensError> {
        let conn = self.conn()?;
        let start_str = start_date.format("%Y-%m-%d").to_string();
        let end_str = end_date.format("%Y-%m-%d").to_string();

        let mut stmt = conn
            .prepare(
                "SELECT date, close FROM price_history
                 WHERE ticker = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date ASC",
            )
            .map_err(db_error)?;

        let rows = stmt
            .query_map(params![ticker, start_str, end_str], |row| {
                let date: String = row.get(0)?;
                let close: Value = row.get(1)?;
                Ok((date, close))
            })
            .map_err(db_error)?;

        let mut points = Vec::new();
        for row in rows {
            let (date_str, close) = row.map_err(db_error)?;
            let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| MarketLensError::SourceParse {
                source_name: "price_history".to_string(),
                reason: format!("invalid date '{date_str}': {e}"),
            })?;
            if let Some(close) = coerce_optional(value_to_text(close).as_deref()) {
                points.push(PricePoint::new(date, close));
            }
        }

        if points.is_empty() {
            return Err(MarketLensError::NoData {
                ticker: ticker.to_string(),
            });
        }
        Ok(points)
    }
}
