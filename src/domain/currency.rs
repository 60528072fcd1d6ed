//! Exchange-rate table and ticker-suffix currency classification.

use std::collections::HashMap;

/// Every rate in [`ExchangeRates`] is expressed as EUR per unit of currency.
pub const REFERENCE_CURRENCY: &str = "EUR";

/// Currency assumed for tickers that match no suffix rule.
pub const DEFAULT_CURRENCY: &str = "USD";

const EUR_RATES: &[(&str, f64)] = &[
    ("EUR", 1.0),
    ("USD", 0.93),
    ("KRW", 0.000696),
    ("JPY", 0.00622),
    ("GBP", 1.17),
    ("CHF", 1.07),
    ("CNY", 0.129),
    ("HKD", 0.119),
    ("TWD", 0.0295),
    ("SGD", 0.69),
    ("BRL", 0.186),
    ("CAD", 0.69),
    ("AUD", 0.605),
    ("INR", 0.0112),
    ("ZAR", 0.049),
];

/// Static currency → EUR conversion table.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRates {
    rates: HashMap<String, f64>,
}

impl ExchangeRates {
    pub fn eur_based() -> Self {
        let rates = EUR_RATES
            .iter()
            .map(|&(code, rate)| (code.to_string(), rate))
            .collect();
        Self { rates }
    }

    pub fn empty() -> Self {
        Self {
            rates: HashMap::new(),
        }
    }

    pub fn with_rate(mut self, code: &str, rate: f64) -> Self {
        self.set_rate(code, rate);
        self
    }

    pub fn set_rate(&mut self, code: &str, rate: f64) {
        self.rates.insert(code.trim().to_uppercase(), rate);
    }

    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates.get(&code.trim().to_uppercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Converts `value` into EUR. Values in an unknown (or absent) currency,
    /// and EUR values, are returned unchanged.
    pub fn to_reference(&self, value: f64, currency: Option<&str>) -> f64 {
        match currency {
            Some(code) if !code.trim().eq_ignore_ascii_case(REFERENCE_CURRENCY) => {
                match self.rate(code) {
                    Some(rate) => value * rate,
                    None => value,
                }
            }
            _ => value,
        }
    }
}

impl Default for ExchangeRates {
    fn default() -> Self {
        Self::eur_based()
    }
}

/// One classification rule: tickers ending with `suffix` trade in `currency`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyRule {
    pub suffix: &'static str,
    pub currency: &'static str,
}

/// Ordered rule table; the first matching suffix wins.
pub const CURRENCY_RULES: &[CurrencyRule] = &[
    CurrencyRule { suffix: ".PA", currency: "EUR" },
    CurrencyRule { suffix: ".AS", currency: "EUR" },
    CurrencyRule { suffix: ".DE", currency: "EUR" },
    CurrencyRule { suffix: ".BR", currency: "EUR" },
    CurrencyRule { suffix: ".MC", currency: "EUR" },
    CurrencyRule { suffix: ".L", currency: "GBP" },
    CurrencyRule { suffix: ".SW", currency: "CHF" },
    CurrencyRule { suffix: ".T", currency: "JPY" },
    CurrencyRule { suffix: ".AX", currency: "AUD" },
    CurrencyRule { suffix: ".KS", currency: "KRW" },
];

pub fn currency_for_ticker(ticker: &str) -> &'static str {
    classify(ticker, CURRENCY_RULES)
}

pub fn classify(ticker: &str, rules: &[CurrencyRule]) -> &'static str {
    let ticker = ticker.trim().to_uppercase();
    rules
        .iter()
        .find(|rule| ticker.ends_with(rule.suffix))
        .map(|rule| rule.currency)
        .unwrap_or(DEFAULT_CURRENCY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eur_is_identity() {
        let rates = ExchangeRates::eur_based();
        assert_eq!(rates.rate("EUR"), Some(1.0));
        assert_eq!(rates.to_reference(1_234.5, Some("EUR")), 1_234.5);
    }

    #[test]
    fn converts_known_currency() {
        let rates = ExchangeRates::eur_based();
        let converted = rates.to_reference(1_000.0, Some("USD"));
        assert!((converted - 930.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_or_missing_currency_passes_through() {
        let rates = ExchangeRates::eur_based();
        assert_eq!(rates.to_reference(500.0, Some("XYZ")), 500.0);
        assert_eq!(rates.to_reference(500.0, None), 500.0);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let rates = ExchangeRates::eur_based();
        assert_eq!(rates.rate("gbp"), Some(1.17));
        assert_eq!(rates.rate(" chf "), Some(1.07));
    }

    #[test]
    fn override_replaces_rate() {
        let rates = ExchangeRates::eur_based().with_rate("usd", 0.9);
        assert_eq!(rates.rate("USD"), Some(0.9));
        assert_eq!(rates.len(), 15);
    }

    #[test]
    fn suffix_rules_cover_each_market() {
        assert_eq!(currency_for_ticker("MC.PA"), "EUR");
        assert_eq!(currency_for_ticker("ASML.AS"), "EUR");
        assert_eq!(currency_for_ticker("SIE.DE"), "EUR");
        assert_eq!(currency_for_ticker("GBLB.BR"), "EUR");
        assert_eq!(currency_for_ticker("IBE.MC"), "EUR");
        assert_eq!(currency_for_ticker("RR.L"), "GBP");
        assert_eq!(currency_for_ticker("ROG.SW"), "CHF");
        assert_eq!(currency_for_ticker("6501.T"), "JPY");
        assert_eq!(currency_for_ticker("MQG.AX"), "AUD");
        assert_eq!(currency_for_ticker("012330.KS"), "KRW");
    }

    #[test]
    fn unmatched_ticker_defaults_to_usd() {
        assert_eq!(currency_for_ticker("WMT"), "USD");
        assert_eq!(currency_for_ticker(""), "USD");
    }

    #[test]
    fn suffix_must_terminate_the_ticker() {
        // ".T" appears inside ".TO" but the ticker does not end with it.
        assert_eq!(currency_for_ticker("SHOP.TO"), "USD");
        assert_eq!(currency_for_ticker("mc.pa"), "EUR");
    }

    #[test]
    fn first_matching_rule_wins() {
        let rules = [
            CurrencyRule { suffix: ".X", currency: "AAA" },
            CurrencyRule { suffix: "X", currency: "BBB" },
        ];
        assert_eq!(classify("FOO.X", &rules), "AAA");
        assert_eq!(classify("FOOX", &rules), "BBB");
    }
}
