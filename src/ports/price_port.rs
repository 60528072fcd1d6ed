//! Historical price-series port.

use crate::domain::error::MarketLensError;
use crate::domain::price_series::PricePoint;
use chrono::NaiveDate;

/// Daily closes per ticker. Implementations are shared across the fetch
/// worker pool, and each ticker may fail independently.
pub trait PricePort: Send + Sync {
    fn fetch_closes(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, MarketLensError>;
}
