//! Raw instrument snapshot rows and their prepared counterpart.

use serde::{Deserialize, Serialize};

/// One raw vendor row. Every cell except the ticker is optional text: the
/// snapshot provider makes no promise about types or cleanliness.
///
/// Deserializes from snake_case headers or the vendor export headers.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InstrumentRecord {
    #[serde(alias = "Ticker")]
    pub ticker: String,
    #[serde(alias = "Nom_complet")]
    pub full_name: Option<String>,
    #[serde(alias = "Secteur")]
    pub sector: Option<String>,
    #[serde(alias = "Industrie")]
    pub industry: Option<String>,
    #[serde(alias = "Pays")]
    pub country: Option<String>,
    #[serde(alias = "Devise")]
    pub currency: Option<String>,
    #[serde(alias = "Prix_actuel")]
    pub price: Option<String>,
    #[serde(alias = "Capitalisation_boursiere")]
    pub market_cap: Option<String>,
    #[serde(alias = "Volume")]
    pub volume: Option<String>,
    #[serde(alias = "PER_historique")]
    pub trailing_pe: Option<String>,
    #[serde(alias = "Rendement_du_dividende")]
    pub dividend_yield: Option<String>,
    #[serde(alias = "Variation_52_semaines")]
    pub week52_change: Option<String>,
    #[serde(alias = "Beta")]
    pub beta: Option<String>,
}

impl InstrumentRecord {
    pub fn new(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            ..Self::default()
        }
    }
}

/// A cleaned, EUR-normalized and scored row of the market table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketRow {
    pub ticker: String,
    pub full_name: String,
    pub sector: String,
    pub industry: String,
    pub country: String,
    pub currency: Option<String>,
    pub price: f64,
    /// Market capitalisation in EUR.
    pub market_cap: f64,
    /// Market capitalisation in the listing currency, before conversion.
    pub original_market_cap: f64,
    pub volume: f64,
    pub trailing_pe: f64,
    /// Percent-scaled dividend yield.
    pub dividend_yield: f64,
    pub week52_change: f64,
    pub beta: Option<f64>,
    pub per_norm: f64,
    pub yield_norm: f64,
    pub score: f64,
}
