//! Instrument identity types
//!
//! `Interval` is a closed set: the data source only understands these
//! tokens, so anything else is rejected while the configuration is read.

use super::errors::ConfigError;
use chrono::{DateTime, Months};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sampling granularity for bars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "3m")]
    Minute3,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "2h")]
    Hour2,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "6h")]
    Hour6,
    #[serde(rename = "8h")]
    Hour8,
    #[serde(rename = "12h")]
    Hour12,
    #[serde(rename = "1d")]
    Day1,
    #[serde(rename = "3d")]
    Day3,
    #[serde(rename = "1w")]
    Week1,
    #[serde(rename = "1M")]
    Month1,
}

const MINUTE_MS: i64 = 60_000;

impl Interval {
    pub const ALL: [Interval; 15] = [
        Interval::Minute1,
        Interval::Minute3,
        Interval::Minute5,
        Interval::Minute15,
        Interval::Minute30,
        Interval::Hour1,
        Interval::Hour2,
        Interval::Hour4,
        Interval::Hour6,
        Interval::Hour8,
        Interval::Hour12,
        Interval::Day1,
        Interval::Day3,
        Interval::Week1,
        Interval::Month1,
    ];

    /// Wire token used by the data source
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minute1 => "1m",
            Self::Minute3 => "3m",
            Self::Minute5 => "5m",
            Self::Minute15 => "15m",
            Self::Minute30 => "30m",
            Self::Hour1 => "1h",
            Self::Hour2 => "2h",
            Self::Hour4 => "4h",
            Self::Hour6 => "6h",
            Self::Hour8 => "8h",
            Self::Hour12 => "12h",
            Self::Day1 => "1d",
            Self::Day3 => "3d",
            Self::Week1 => "1w",
            Self::Month1 => "1M",
        }
    }

    /// Fixed length in milliseconds; `None` for calendar months
    pub fn fixed_millis(&self) -> Option<i64> {
        let minutes = match self {
            Self::Minute1 => 1,
            Self::Minute3 => 3,
            Self::Minute5 => 5,
            Self::Minute15 => 15,
            Self::Minute30 => 30,
            Self::Hour1 => 60,
            Self::Hour2 => 120,
            Self::Hour4 => 240,
            Self::Hour6 => 360,
            Self::Hour8 => 480,
            Self::Hour12 => 720,
            Self::Day1 => 1_440,
            Self::Day3 => 4_320,
            Self::Week1 => 10_080,
            Self::Month1 => return None,
        };
        Some(minutes * MINUTE_MS)
    }

    /// Last millisecond covered by a bar opening at `open_time`
    pub fn close_time(&self, open_time: i64) -> i64 {
        match self.fixed_millis() {
            Some(ms) => open_time + ms - 1,
            None => DateTime::from_timestamp_millis(open_time)
                .and_then(|t| t.checked_add_months(Months::new(1)))
                .map(|t| t.timestamp_millis() - 1)
                // Only reachable for timestamps outside chrono's range
                .unwrap_or(open_time),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interval::ALL
            .iter()
            .copied()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownInterval(s.to_string()))
    }
}

/// A tracked symbol plus the interval its bars are requested at
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    /// Exchange symbol, upper-case (e.g. "BTCUSDT")
    pub symbol: String,
    pub interval: Interval,
    /// Whether the derivatives funding-rate endpoint applies
    #[serde(default)]
    pub funding: bool,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, interval: Interval) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            interval,
            funding: false,
        }
    }

    pub fn with_funding(mut self, funding: bool) -> Self {
        self.funding = funding;
        self
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.symbol, self.interval)
    }
}
