//! Binance REST client for klines and funding rates
//!
//! Kline payload (one row per bar, fixed positions):
//!
//! | index | field                 |
//! |-------|-----------------------|
//! | 0     | open time (ms)        |
//! | 1..=4 | open, high, low, close|
//! | 5     | base volume           |
//! | 6     | close time (ms)       |
//! | 7..   | ignored               |
//!
//! Prices arrive as strings; numbers are accepted too.

use super::types::{Bar, Window};
use super::{clamp_bar_count, SeriesFetcher};
use crate::core::{FetchError, Instrument};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

pub const SPOT_BASE_URL: &str = "https://api.binance.com/api/v3";
pub const FUTURES_BASE_URL: &str = "https://fapi.binance.com/fapi/v1";

/// Longest error body kept in a `FetchError::Status`
const MAX_ERROR_BODY: usize = 256;

/// Which market the kline endpoint is served from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    Spot,
    Futures,
}

/// HTTP client settings
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub market: Market,
    pub spot_base_url: String,
    pub futures_base_url: String,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            market: Market::Futures,
            spot_base_url: SPOT_BASE_URL.to_string(),
            futures_base_url: FUTURES_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(15),
            user_agent: concat!("klaxon/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// `SeriesFetcher` backed by the Binance public REST API
#[derive(Debug, Clone)]
pub struct BinanceFetcher {
    config: FetcherConfig,
    client: reqwest::Client,
}

impl BinanceFetcher {
    /// Build the HTTP client; fails only if the TLS backend cannot initialize
    pub fn new(config: FetcherConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    fn klines_base(&self) -> &str {
        match self.config.market {
            Market::Spot => &self.config.spot_base_url,
            Market::Futures => &self.config.futures_base_url,
        }
    }

    /// GET `url` with `query`, returning the decoded JSON body
    async fn get_json(
        &self,
        symbol: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Value, FetchError> {
        let request_err = |source: reqwest::Error| FetchError::Request {
            symbol: symbol.to_string(),
            source: source.without_url(),
        };

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(request_err)?;

        let status = response.status();
        let text = response.text().await.map_err(request_err)?;

        if !status.is_success() {
            let mut body = text;
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(FetchError::Status {
                symbol: symbol.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| FetchError::malformed(symbol, format!("invalid JSON: {}", e)))
    }
}

#[async_trait]
impl SeriesFetcher for BinanceFetcher {
    async fn fetch(&self, instrument: &Instrument, bar_count: usize) -> Result<Window, FetchError> {
        let limit = clamp_bar_count(bar_count);
        let url = format!("{}/klines", self.klines_base());

        debug!(
            symbol = %instrument.symbol,
            interval = %instrument.interval,
            limit,
            "Requesting klines"
        );

        let payload = self
            .get_json(
                &instrument.symbol,
                &url,
                &[
                    ("symbol", instrument.symbol.clone()),
                    ("interval", instrument.interval.as_str().to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        let bars = parse_klines(instrument, &payload)?;
        debug!(symbol = %instrument.symbol, bars = bars.len(), "Klines received");

        Window::new(instrument.clone(), bars).map_err(|source| FetchError::Invalid {
            symbol: instrument.symbol.clone(),
            source,
        })
    }

    async fn fetch_funding_rate(&self, instrument: &Instrument) -> Result<Decimal, FetchError> {
        if !instrument.funding {
            return Err(FetchError::Unsupported {
                symbol: instrument.symbol.clone(),
                operation: "funding rate",
            });
        }

        let url = format!("{}/premiumIndex", self.config.futures_base_url);
        let payload = self
            .get_json(
                &instrument.symbol,
                &url,
                &[("symbol", instrument.symbol.clone())],
            )
            .await?;

        parse_funding_rate(&instrument.symbol, &payload)
    }
}

/// Decode a kline payload into bars (no invariant checks; see `Window::new`)
pub fn parse_klines(instrument: &Instrument, payload: &Value) -> Result<Vec<Bar>, FetchError> {
    let symbol = instrument.symbol.as_str();
    let rows = payload
        .as_array()
        .ok_or_else(|| FetchError::malformed(symbol, "expected an array of klines"))?;

    rows.iter()
        .enumerate()
        .map(|(i, row)| parse_kline_row(instrument, i, row))
        .collect()
}

fn parse_kline_row(instrument: &Instrument, index: usize, row: &Value) -> Result<Bar, FetchError> {
    let symbol = instrument.symbol.as_str();
    let fields = row
        .as_array()
        .ok_or_else(|| FetchError::malformed(symbol, format!("kline {} is not an array", index)))?;

    if fields.len() < 6 {
        return Err(FetchError::malformed(
            symbol,
            format!("kline {} has {} fields, need at least 6", index, fields.len()),
        ));
    }

    let open_time = fields[0].as_i64().ok_or_else(|| {
        FetchError::malformed(symbol, format!("kline {}: open time is not an integer", index))
    })?;

    let decimal_at = |pos: usize, name: &str| {
        json_decimal(&fields[pos]).ok_or_else(|| {
            FetchError::malformed(
                symbol,
                format!("kline {}: {} is not a decimal: {}", index, name, fields[pos]),
            )
        })
    };

    let close_time = fields
        .get(6)
        .and_then(Value::as_i64)
        .unwrap_or_else(|| instrument.interval.close_time(open_time));

    Ok(Bar {
        open_time,
        open: decimal_at(1, "open")?,
        high: decimal_at(2, "high")?,
        low: decimal_at(3, "low")?,
        close: decimal_at(4, "close")?,
        volume: decimal_at(5, "volume")?,
        close_time,
    })
}

/// Decode a premium-index payload; returns the last funding rate in percent
pub fn parse_funding_rate(symbol: &str, payload: &Value) -> Result<Decimal, FetchError> {
    let raw = payload
        .get("lastFundingRate")
        .ok_or_else(|| FetchError::malformed(symbol, "missing lastFundingRate"))?;

    let rate = json_decimal(raw).ok_or_else(|| {
        FetchError::malformed(symbol, format!("lastFundingRate is not a decimal: {}", raw))
    })?;

    Ok(rate * Decimal::ONE_HUNDRED)
}

/// Accept `"123.45"` or `123.45` (including exponent notation)
fn json_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}
