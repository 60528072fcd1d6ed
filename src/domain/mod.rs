//! Core domain types and logic.

pub mod allocation;
pub mod assessment;
pub mod backtest;
pub mod cleaning;
pub mod config_validation;
pub mod currency;
pub mod error;
pub mod instrument;
pub mod market_analytics;
pub mod market_data;
pub mod metrics;
pub mod portfolio;
pub mod price_series;
pub mod scoring;
pub mod session_cache;
pub mod tape;
pub mod valuation;
