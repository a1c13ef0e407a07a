//! Domain-specific error types for the monitor core
//!
//! These error types carry enough context (symbol, open time, cause) for a
//! single log line to be meaningful on its own. The monitor loop matches on
//! them explicitly; nothing here aborts the process except `ConfigError`,
//! which is only produced at startup.

use rust_decimal::Decimal;
use thiserror::Error;

/// Bar or window invariant violations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A price or volume field is negative
    #[error("bar at {open_time}: negative {field} ({value})")]
    Negative {
        open_time: i64,
        field: &'static str,
        value: Decimal,
    },

    /// high < max(open, close) or low > min(open, close)
    #[error("bar at {open_time}: inconsistent OHLC (o={open} h={high} l={low} c={close})")]
    InconsistentPrices {
        open_time: i64,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    },

    /// Open times must be strictly increasing across a window
    #[error("open time {current} does not follow {previous}")]
    NonIncreasingOpenTime { previous: i64, current: i64 },

    /// Window exceeds the source API cap
    #[error("window holds {len} bars (max {max})")]
    WindowTooLong { len: usize, max: usize },
}

/// Failures retrieving bars or funding rates
///
/// Every variant carries the symbol so the caller can log and skip
/// that instrument without extra bookkeeping.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure: connect, timeout, body read
    #[error("{symbol}: request failed: {source}")]
    Request {
        symbol: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx response
    #[error("{symbol}: HTTP {status}: {body}")]
    Status {
        symbol: String,
        status: u16,
        body: String,
    },

    /// Payload did not have the expected shape
    #[error("{symbol}: malformed payload: {reason}")]
    Malformed { symbol: String, reason: String },

    /// Payload parsed but violated bar/window invariants
    #[error("{symbol}: invalid data: {source}")]
    Invalid {
        symbol: String,
        #[source]
        source: ValidationError,
    },

    /// Operation not available for this instrument (e.g. funding on spot)
    #[error("{symbol}: {operation} not supported")]
    Unsupported {
        symbol: String,
        operation: &'static str,
    },
}

impl FetchError {
    /// Symbol of the instrument the failure belongs to
    pub fn symbol(&self) -> &str {
        match self {
            FetchError::Request { symbol, .. }
            | FetchError::Status { symbol, .. }
            | FetchError::Malformed { symbol, .. }
            | FetchError::Invalid { symbol, .. }
            | FetchError::Unsupported { symbol, .. } => symbol,
        }
    }

    pub(crate) fn malformed(symbol: &str, reason: impl Into<String>) -> Self {
        FetchError::Malformed {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }
}

/// Metric computations that cannot produce a value
///
/// Division by zero is guarded with documented sentinels everywhere except a
/// zero open price in `percent_change`, which is a data integrity violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComputationError {
    #[error("bar at {open_time} has zero open price")]
    ZeroOpenPrice { open_time: i64 },

    #[error("window contains no bars")]
    EmptyWindow,
}

/// Startup configuration errors (fatal)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown interval '{0}' (expected one of 1m 3m 5m 15m 30m 1h 2h 4h 6h 8h 12h 1d 3d 1w 1M)")]
    UnknownInterval(String),

    #[error("no instruments configured")]
    NoInstruments,

    #[error("invalid symbol '{0}'")]
    InvalidSymbol(String),

    #[error("invalid threshold {name} = {value}: {reason}")]
    InvalidThreshold {
        name: &'static str,
        value: Decimal,
        reason: &'static str,
    },

    #[error("bucket edges must start at 0 and be strictly increasing: {0:?}")]
    InvalidBucketEdges(Vec<Decimal>),

    #[error("{name} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        name: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("unknown amplitude mode '{0}' (expected range, down_only or open_range)")]
    UnknownAmplitudeMode(String),

    #[error("unknown severity '{0}'")]
    UnknownSeverity(String),

    #[error("invalid log level '{0}'")]
    InvalidLogLevel(String),

    #[error("telegram output enabled but {0} is not set")]
    MissingSecret(&'static str),
}

/// Delivery failures from a notifier output
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("file output {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("telegram request failed: {0}")]
    Telegram(#[from] reqwest::Error),

    #[error("telegram rejected message: HTTP {status}: {body}")]
    TelegramRejected { status: u16, body: String },

    #[error("{failed} of {total} outputs failed: {first}")]
    Partial {
        failed: usize,
        total: usize,
        first: String,
    },
}

/// The explicit set of failures the monitor loop isolates per instrument
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("{symbol}: {source}")]
    Computation {
        symbol: String,
        #[source]
        source: ComputationError,
    },
}
