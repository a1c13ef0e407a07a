//! Scripted `SeriesFetcher` for monitor loop tests
//!
//! Each symbol gets a fixed response that is replayed on every call, so a
//! test can run several cycles and count how often each instrument was hit.

use crate::core::{FetchError, Instrument};
use crate::data::{clamp_bar_count, Bar, SeriesFetcher, Window};
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Response<T> {
    Ok(T),
    Status { status: u16, body: String },
}

/// Programmable fetcher with per-symbol responses and call counters
#[derive(Default)]
pub struct ScriptedFetcher {
    bars: HashMap<String, Response<Vec<Bar>>>,
    funding: HashMap<String, Response<Decimal>>,
    latency: Option<Duration>,
    fetch_calls: Mutex<HashMap<String, usize>>,
    funding_calls: Mutex<HashMap<String, usize>>,
    requested_counts: Mutex<Vec<usize>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bars` for `symbol` (trimmed to the requested count)
    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.bars.insert(symbol.to_uppercase(), Response::Ok(bars));
        self
    }

    /// Fail every bar request for `symbol` with an HTTP status
    pub fn with_failure(mut self, symbol: &str, status: u16, body: &str) -> Self {
        self.bars.insert(
            symbol.to_uppercase(),
            Response::Status {
                status,
                body: body.to_string(),
            },
        );
        self
    }

    pub fn with_funding(mut self, symbol: &str, rate: Decimal) -> Self {
        self.funding.insert(symbol.to_uppercase(), Response::Ok(rate));
        self
    }

    pub fn with_funding_failure(mut self, symbol: &str, status: u16) -> Self {
        self.funding.insert(
            symbol.to_uppercase(),
            Response::Status {
                status,
                body: "funding unavailable".to_string(),
            },
        );
        self
    }

    /// Sleep (tokio time) before answering each call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn fetch_count(&self, symbol: &str) -> usize {
        self.fetch_calls.lock().get(symbol).copied().unwrap_or(0)
    }

    pub fn funding_count(&self, symbol: &str) -> usize {
        self.funding_calls.lock().get(symbol).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetch_calls.lock().values().sum()
    }

    /// Bar counts as received (before clamping)
    pub fn requested_counts(&self) -> Vec<usize> {
        self.requested_counts.lock().clone()
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn status_error(symbol: &str, status: u16, body: &str) -> FetchError {
    FetchError::Status {
        symbol: symbol.to_string(),
        status,
        body: body.to_string(),
    }
}

#[async_trait]
impl SeriesFetcher for ScriptedFetcher {
    async fn fetch(&self, instrument: &Instrument, bar_count: usize) -> Result<Window, FetchError> {
        let symbol = instrument.symbol.as_str();
        *self.fetch_calls.lock().entry(symbol.to_string()).or_insert(0) += 1;
        self.requested_counts.lock().push(bar_count);
        self.delay().await;

        match self.bars.get(symbol) {
            Some(Response::Ok(bars)) => {
                let keep = clamp_bar_count(bar_count).min(bars.len());
                let recent = bars[bars.len() - keep..].to_vec();
                Window::new(instrument.clone(), recent).map_err(|source| FetchError::Invalid {
                    symbol: symbol.to_string(),
                    source,
                })
            }
            Some(Response::Status { status, body }) => Err(status_error(symbol, *status, body)),
            None => Err(status_error(symbol, 400, "Invalid symbol.")),
        }
    }

    async fn fetch_funding_rate(&self, instrument: &Instrument) -> Result<Decimal, FetchError> {
        let symbol = instrument.symbol.as_str();
        *self.funding_calls.lock().entry(symbol.to_string()).or_insert(0) += 1;

        if !instrument.funding {
            return Err(FetchError::Unsupported {
                symbol: symbol.to_string(),
                operation: "funding rate",
            });
        }
        self.delay().await;

        match self.funding.get(symbol) {
            Some(Response::Ok(rate)) => Ok(*rate),
            Some(Response::Status { status, body }) => Err(status_error(symbol, *status, body)),
            None => Err(status_error(symbol, 400, "Invalid symbol.")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Interval;
    use crate::testing::bars_with_volumes;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_scripted_fetch_trims_and_counts() {
        let fetcher = ScriptedFetcher::new().with_bars("BTCUSDT", bars_with_volumes(&[dec!(1); 30]));
        let instrument = Instrument::new("BTCUSDT", Interval::Minute1);

        let window = fetcher.fetch(&instrument, 20).await.unwrap();
        assert_eq!(window.len(), 20);
        assert_eq!(window.bars()[0].open_time, 10 * 60_000);

        let window = fetcher.fetch(&instrument, 0).await.unwrap();
        assert_eq!(window.len(), 1);

        assert_eq!(fetcher.fetch_count("BTCUSDT"), 2);
        assert_eq!(fetcher.requested_counts(), vec![20, 0]);
    }

    #[tokio::test]
    async fn test_scripted_failure_and_unknown_symbol() {
        let fetcher = ScriptedFetcher::new().with_failure("ETHUSDT", 503, "busy");

        let err = fetcher
            .fetch(&Instrument::new("ETHUSDT", Interval::Minute1), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));

        let err = fetcher
            .fetch(&Instrument::new("XRPUSDT", Interval::Minute1), 5)
            .await
            .unwrap_err();
        assert_eq!(err.symbol(), "XRPUSDT");
    }

    #[tokio::test]
    async fn test_scripted_funding() {
        let fetcher = ScriptedFetcher::new().with_funding("BTCUSDT", dec!(0.01));

        let spot = Instrument::new("BTCUSDT", Interval::Minute1);
        assert!(matches!(
            fetcher.fetch_funding_rate(&spot).await,
            Err(FetchError::Unsupported { .. })
        ));

        let perp = spot.with_funding(true);
        assert_eq!(fetcher.fetch_funding_rate(&perp).await.unwrap(), dec!(0.01));
        assert_eq!(fetcher.funding_count("BTCUSDT"), 2);
    }
}
