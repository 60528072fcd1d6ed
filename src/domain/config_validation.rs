//! Configuration validation.
//!
//! Checks every section a command depends on before any data is loaded, so
//! a bad value surfaces as a config error instead of a half-finished run.

use crate::domain::cleaning::YieldScale;
use crate::domain::error::MarketLensError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const MAX_SHARE_DECIMALS: i64 = 8;

/// Where snapshot and price data come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Csv,
    Sqlite,
}

impl std::str::FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(DataSource::Csv),
            "sqlite" => Ok(DataSource::Sqlite),
            other => Err(format!("unknown data source '{other}', expected csv or sqlite")),
        }
    }
}

/// `[data] source`, defaulting to csv.
pub fn data_source(config: &dyn ConfigPort) -> Result<DataSource, MarketLensError> {
    match config.get_string("data", "source") {
        None => Ok(DataSource::Csv),
        Some(s) => s.parse().map_err(|e: String| MarketLensError::invalid("data", "source", e)),
    }
}

/// Reads a yield scale key; absent means percent.
pub fn yield_scale(config: &dyn ConfigPort, section: &str, key: &str) -> Result<YieldScale, MarketLensError> {
    match config.get_string(section, key) {
        None => Ok(YieldScale::Percent),
        Some(s) => s.parse().map_err(|e: String| MarketLensError::invalid(section, key, e)),
    }
}

/// Parses an optional `YYYY-MM-DD` key.
pub fn optional_date(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<NaiveDate>, MarketLensError> {
    config
        .get_string(section, key)
        .map(|s| {
            NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|_| {
                MarketLensError::invalid(section, key, format!("invalid {key} format, expected YYYY-MM-DD"))
            })
        })
        .transpose()
}

pub fn required_string(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, MarketLensError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(MarketLensError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

/// Everything the `market`, `assess` and `tape` commands read.
pub fn validate_market_config(config: &dyn ConfigPort) -> Result<(), MarketLensError> {
    validate_source_paths(config)?;
    if data_source(config)? == DataSource::Csv {
        required_string(config, "data", "snapshot_path")?;
    }
    yield_scale(config, "data", "snapshot_yield_scale")?;
    validate_rates(config)?;
    Ok(())
}

/// Everything the `portfolio` and `valuation` commands read.
pub fn validate_portfolio_config(config: &dyn ConfigPort) -> Result<(), MarketLensError> {
    validate_source_paths(config)?;
    if data_source(config)? == DataSource::Csv {
        required_string(config, "data", "prices_dir")?;
    }
    required_string(config, "data", "allocation_path")?;
    yield_scale(config, "data", "allocation_yield_scale")?;
    validate_rates(config)?;
    validate_initial_investment(config)?;
    validate_share_decimals(config)?;
    validate_dates(config)?;
    validate_workers(config)?;
    validate_timeouts(config)?;
    Ok(())
}

pub fn validate_tape_config(config: &dyn ConfigPort) -> Result<(), MarketLensError> {
    let tickers = required_string(config, "tape", "tickers")?;
    if parse_tape_list(&tickers).is_empty() {
        return Err(MarketLensError::invalid("tape", "tickers", "no tickers listed"));
    }
    if config.get_int("tape", "ttl_secs", 300) < 1 {
        return Err(MarketLensError::invalid("tape", "ttl_secs", "ttl_secs must be at least 1"));
    }
    Ok(())
}

/// Every `[rates]` entry must be a positive number.
pub fn validate_rates(config: &dyn ConfigPort) -> Result<(), MarketLensError> {
    for currency in config.section_keys("rates") {
        let rate = config.get_double("rates", &currency, 0.0);
        if !rate.is_finite() || rate <= 0.0 {
            return Err(MarketLensError::invalid(
                "rates",
                &currency,
                "exchange rate must be a positive number",
            ));
        }
    }
    Ok(())
}

/// Splits `Label:TICKER, TICKER2` into (label, ticker) pairs. A bare ticker
/// is its own label.
pub fn parse_tape_list(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter_map(|item| match item.rsplit_once(':') {
            Some((label, ticker)) => {
                let ticker = ticker.trim();
                if ticker.is_empty() {
                    return None;
                }
                let label = label.trim();
                let label = if label.is_empty() { ticker } else { label };
                Some((label.to_string(), ticker.to_uppercase()))
            }
            None => Some((item.to_string(), item.to_uppercase())),
        })
        .collect()
}

fn validate_source_paths(config: &dyn ConfigPort) -> Result<(), MarketLensError> {
    if data_source(config)? == DataSource::Sqlite {
        required_string(config, "data", "sqlite_path")?;
    }
    Ok(())
}

fn validate_initial_investment(config: &dyn ConfigPort) -> Result<(), MarketLensError> {
    let value = config.get_double(
        "portfolio",
        "initial_investment",
        crate::domain::allocation::DEFAULT_INITIAL_INVESTMENT,
    );
    if !value.is_finite() || value <= 0.0 {
        return Err(MarketLensError::invalid(
            "portfolio",
            "initial_investment",
            "initial_investment must be positive",
        ));
    }
    Ok(())
}

fn validate_share_decimals(config: &dyn ConfigPort) -> Result<(), MarketLensError> {
    let value = config.get_int(
        "portfolio",
        "share_decimals",
        crate::domain::allocation::DEFAULT_SHARE_DECIMALS as i64,
    );
    if !(0..=MAX_SHARE_DECIMALS).contains(&value) {
        return Err(MarketLensError::invalid(
            "portfolio",
            "share_decimals",
            format!("share_decimals must be between 0 and {MAX_SHARE_DECIMALS}"),
        ));
    }
    Ok(())
}

/// Both dates are optional here: the start can come from the command line
/// and the end defaults to today.
fn validate_dates(config: &dyn ConfigPort) -> Result<(), MarketLensError> {
    let start = optional_date(config, "portfolio", "start_date")?;
    let end = optional_date(config, "portfolio", "end_date")?;
    if let (Some(start), Some(end)) = (start, end)
        && start >= end
    {
        return Err(MarketLensError::invalid(
            "portfolio",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

fn validate_workers(config: &dyn ConfigPort) -> Result<(), MarketLensError> {
    let value = config.get_int(
        "portfolio",
        "max_workers",
        crate::domain::backtest::DEFAULT_MAX_WORKERS as i64,
    );
    if value < 1 {
        return Err(MarketLensError::invalid(
            "portfolio",
            "max_workers",
            "max_workers must be at least 1",
        ));
    }
    Ok(())
}

fn validate_timeouts(config: &dyn ConfigPort) -> Result<(), MarketLensError> {
    if config.get_int("portfolio", "fetch_timeout_secs", 30) < 1 {
        return Err(MarketLensError::invalid(
            "portfolio",
            "fetch_timeout_secs",
            "fetch_timeout_secs must be at least 1",
        ));
    }
    if config.get_int("portfolio", "valuation_lookback_days", 7) < 0 {
        return Err(MarketLensError::invalid(
            "portfolio",
            "valuation_lookback_days",
            "valuation_lookback_days must be non-negative",
        ));
    }
    Ok(())
}
