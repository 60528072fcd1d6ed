//! Current value of an allocation from the latest available closes.

use super::allocation::{Allocation, AllocationEntry};
use super::price_series::clean_window;
use crate::ports::price_port::PricePort;
use chrono::{Duration, NaiveDate};

pub const DEFAULT_LOOKBACK_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq)]
pub struct PositionValue {
    pub ticker: String,
    pub shares: f64,
    pub exchange_rate: f64,
    pub initial_position_value: f64,
    pub last_close: Option<f64>,
    pub price_date: Option<NaiveDate>,
    pub current_value: f64,
    pub variation: f64,
}

impl PositionValue {
    pub fn is_fallback(&self) -> bool {
        self.last_close.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioValuation {
    pub as_of: NaiveDate,
    pub total_initial_value: f64,
    pub total_current_value: f64,
    pub variation: f64,
    pub positions: Vec<PositionValue>,
}

/// Values every position at its latest close in `[as_of - lookback_days,
/// as_of]`. A position without a close keeps its initial value.
pub fn value_portfolio(
    allocation: &Allocation,
    prices: &dyn PricePort,
    as_of: NaiveDate,
    lookback_days: i64,
) -> PortfolioValuation {
    let start = Duration::try_days(lookback_days.max(0))
        .and_then(|lookback| as_of.checked_sub_signed(lookback))
        .unwrap_or(NaiveDate::MIN);
    let positions: Vec<PositionValue> = allocation
        .entries
        .iter()
        .map(|entry| value_position(entry, prices, start, as_of))
        .collect();

    let total_initial_value: f64 = positions.iter().map(|p| p.initial_position_value).sum();
    let total_current_value: f64 = positions.iter().map(|p| p.current_value).sum();

    PortfolioValuation {
        as_of,
        total_initial_value,
        total_current_value,
        variation: percent_change(total_initial_value, total_current_value),
        positions,
    }
}

fn value_position(
    entry: &AllocationEntry,
    prices: &dyn PricePort,
    start: NaiveDate,
    as_of: NaiveDate,
) -> PositionValue {
    let latest = match prices.fetch_closes(&entry.ticker, start, as_of) {
        Ok(points) => clean_window(points, start, as_of).last().copied(),
        Err(e) => {
            tracing::warn!(ticker = %entry.ticker, error = %e, "latest close unavailable");
            None
        }
    };

    let current_value = match latest {
        Some(p) => p.close * entry.shares * entry.exchange_rate,
        None => entry.initial_position_value,
    };

    PositionValue {
        ticker: entry.ticker.clone(),
        shares: entry.shares,
        exchange_rate: entry.exchange_rate,
        initial_position_value: entry.initial_position_value,
        last_close: latest.map(|p| p.close),
        price_date: latest.map(|p| p.date),
        current_value,
        variation: percent_change(entry.initial_position_value, current_value),
    }
}

fn percent_change(from: f64, to: f64) -> f64 {
    if from > 0.0 { (to / from - 1.0) * 100.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::allocation::{AllocationConfig, AllocationSource};
    use crate::domain::cleaning::YieldScale;
    use crate::domain::currency::ExchangeRates;
    use crate::domain::error::MarketLensError;
    use crate::domain::price_series::PricePoint;
    use approx::assert_relative_eq;

    struct OneTicker;

    impl PricePort for OneTicker {
        fn fetch_closes(
            &self,
            ticker: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Vec<PricePoint>, MarketLensError> {
            if ticker != "A.PA" {
                return Err(MarketLensError::unavailable("offline"));
            }
            // One point before the window, two inside it.
            Ok(vec![
                PricePoint::new(start.pred_opt().unwrap_or(start), 1.0),
                PricePoint::new(end - Duration::days(2), 11.0),
                PricePoint::new(end - Duration::days(1), 12.0),
            ])
        }
    }

    fn allocation() -> Allocation {
        Allocation::equal_weight(
            &[AllocationSource::new("A.PA", 10.0), AllocationSource::new("B.PA", 10.0)],
            &AllocationConfig {
                initial_investment: 200.0,
                share_decimals: 2,
            },
            &ExchangeRates::eur_based(),
            YieldScale::Percent,
        )
    }

    #[test]
    fn latest_close_values_position() {
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let valuation = value_portfolio(&allocation(), &OneTicker, as_of, DEFAULT_LOOKBACK_DAYS);

        let a = &valuation.positions[0];
        assert_eq!(a.last_close, Some(12.0));
        assert_eq!(a.price_date, Some(as_of - Duration::days(1)));
        assert_relative_eq!(a.current_value, 120.0, epsilon = 1e-9);
        assert_relative_eq!(a.variation, 20.0, epsilon = 1e-9);

        let b = &valuation.positions[1];
        assert!(b.is_fallback());
        assert_relative_eq!(b.current_value, 100.0);
        assert_eq!(b.variation, 0.0);

        assert_relative_eq!(valuation.total_initial_value, 200.0, epsilon = 1e-9);
        assert_relative_eq!(valuation.total_current_value, 220.0, epsilon = 1e-9);
        assert_relative_eq!(valuation.variation, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn empty_allocation_is_zero() {
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let valuation = value_portfolio(&Allocation::empty(100.0), &OneTicker, as_of, 7);
        assert!(valuation.positions.is_empty());
        assert_eq!(valuation.total_current_value, 0.0);
        assert_eq!(valuation.variation, 0.0);
    }

    #[test]
    fn huge_lookback_reaches_back_to_earliest_date() {
        let as_of = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let valuation = value_portfolio(&allocation(), &OneTicker, as_of, 200_000_000);
        assert_eq!(valuation.positions[0].last_close, Some(12.0));

        let valuation = value_portfolio(&Allocation::empty(1000.0), &OneTicker, as_of, i64::MAX);
        assert!(valuation.positions.is_empty());
    }
}
