//! Market data retrieval
//!
//! `SeriesFetcher` is the seam between the monitor loop and the exchange:
//! the loop only ever sees a validated `Window` or a `FetchError`.
//!
//! ## Contract
//! - `bar_count` is clamped to `[1, MAX_BARS]` before any request is made
//! - bars come back oldest first, the last one possibly still forming
//! - every failure (transport, status, payload, invariants) is a `FetchError`
//! - no retries: retry policy belongs to the caller

pub mod binance;
pub mod types;
pub mod validator;

pub use binance::{
    parse_funding_rate, parse_klines, BinanceFetcher, FetcherConfig, Market, FUTURES_BASE_URL,
    SPOT_BASE_URL,
};
pub use types::{Bar, Window, MAX_BARS};
pub use validator::{validate_bar, validate_sequence};

use crate::core::{FetchError, Instrument};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Clamp a requested bar count into what the source accepts
#[inline]
pub fn clamp_bar_count(bar_count: usize) -> usize {
    bar_count.clamp(1, MAX_BARS)
}

/// Source of recent bars (and funding rates) for tracked instruments
#[async_trait]
pub trait SeriesFetcher: Send + Sync {
    /// Fetch the most recent `bar_count` bars, oldest first
    async fn fetch(&self, instrument: &Instrument, bar_count: usize) -> Result<Window, FetchError>;

    /// Current funding rate in percent (derivatives only)
    async fn fetch_funding_rate(&self, instrument: &Instrument) -> Result<Decimal, FetchError>;
}
