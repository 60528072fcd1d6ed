//! Per-fetch deadline around another price provider.

use crate::domain::error::MarketLensError;
use crate::domain::price_series::PricePoint;
use crate::ports::price_port::PricePort;
use chrono::NaiveDate;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Runs each fetch on its own thread and gives up after `timeout`. A late
/// fetch keeps running detached; its result is dropped.
pub struct TimeoutPricePort {
    inner: Arc<dyn PricePort>,
    timeout: Duration,
}

impl TimeoutPricePort {
    pub fn new(inner: Arc<dyn PricePort>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl PricePort for TimeoutPricePort {
    fn fetch_closes(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, MarketLensError> {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let owned_ticker = ticker.to_string();

        thread::Builder::new()
            .name(format!("fetch-{ticker}"))
            .spawn(move || {
                // The receiver is gone if the deadline already passed.
                let _ = tx.send(inner.fetch_closes(&owned_ticker, start_date, end_date));
            })?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(ticker, timeout_secs = self.timeout.as_secs(), "price fetch timed out");
                Err(MarketLensError::Timeout {
                    ticker: ticker.to_string(),
                    seconds: self.timeout.as_secs(),
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(MarketLensError::unavailable(format!(
                "fetch worker for {ticker} exited without a result"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowPrices {
        delay: Duration,
    }

    impl PricePort for SlowPrices {
        fn fetch_closes(
            &self,
            ticker: &str,
            start_date: NaiveDate,
            _end_date: NaiveDate,
        ) -> Result<Vec<PricePoint>, MarketLensError> {
            thread::sleep(self.delay);
            if ticker == "BAD" {
                return Err(MarketLensError::NoData {
                    ticker: ticker.to_string(),
                });
            }
            Ok(vec![PricePoint::new(start_date, 10.0)])
        }
    }

    struct PanickingPrices;

    impl PricePort for PanickingPrices {
        fn fetch_closes(&self, _: &str, _: NaiveDate, _: NaiveDate) -> Result<Vec<PricePoint>, MarketLensError> {
            panic!("provider crashed");
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()
    }

    #[test]
    fn fast_fetch_passes_through() {
        let port = TimeoutPricePort::new(
            Arc::new(SlowPrices {
                delay: Duration::from_millis(1),
            }),
            Duration::from_secs(5),
        );
        let points = port.fetch_closes("OK", day(), day()).unwrap();
        assert_eq!(points, vec![PricePoint::new(day(), 10.0)]);
    }

    #[test]
    fn inner_error_passes_through() {
        let port = TimeoutPricePort::new(
            Arc::new(SlowPrices {
                delay: Duration::from_millis(1),
            }),
            Duration::from_secs(5),
        );
        let err = port.fetch_closes("BAD", day(), day()).unwrap_err();
        assert!(matches!(err, MarketLensError::NoData { .. }));
    }

    #[test]
    fn slow_fetch_times_out() {
        let port = TimeoutPricePort::new(
            Arc::new(SlowPrices {
                delay: Duration::from_millis(500),
            }),
            Duration::from_millis(20),
        );
        let err = port.fetch_closes("SLOW", day(), day()).unwrap_err();
        assert!(matches!(err, MarketLensError::Timeout { ticker, .. } if ticker == "SLOW"));
    }

    #[test]
    fn crashed_worker_is_source_error() {
        let port = TimeoutPricePort::new(Arc::new(PanickingPrices), Duration::from_secs(5));
        let err = port.fetch_closes("X", day(), day()).unwrap_err();
        assert!(matches!(err, MarketLensError::Source { .. }));
    }
}
