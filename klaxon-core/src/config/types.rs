use crate::data::{Market, FUTURES_BASE_URL, SPOT_BASE_URL};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level TOML document
///
/// Every section has defaults, so a file containing only `[[instruments]]`
/// entries is a complete configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KlaxonConfig {
    pub monitor: MonitorConfig,
    pub fetcher: FetcherSection,
    pub alerts: AlertsConfig,
    pub analysis: AnalysisConfig,
    pub logging: LoggingConfig,
    pub instruments: Vec<InstrumentConfig>,
}

/// `[monitor]`: loop timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Sleep after each cycle (seconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Pause between instruments within a cycle (milliseconds)
    #[serde(default = "default_instrument_pause")]
    pub instrument_pause_ms: u64,

    /// Bars fetched per instrument
    #[serde(default = "default_monitor_bar_count")]
    pub bar_count: u64,

    /// "range", "down_only" or "open_range"
    #[serde(default = "default_monitor_mode")]
    pub amplitude_mode: String,

    /// Stop after this many cycles (unset = run forever)
    #[serde(default)]
    pub max_cycles: Option<u64>,
}

/// `[fetcher]`: data source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherSection {
    #[serde(default = "default_market")]
    pub market: Market,

    #[serde(default = "default_spot_base_url")]
    pub spot_base_url: String,

    #[serde(default = "default_futures_base_url")]
    pub futures_base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Overrides the default `klaxon/<version>` user agent
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// `[alerts]`: rule thresholds and outputs
///
/// Thresholds are percentages except `volume_multiplier`. A threshold of 0
/// disables its rule; `amplitude` is disabled unless set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    #[serde(default = "default_volume_multiplier")]
    pub volume_multiplier: Option<Decimal>,

    #[serde(default = "default_percent_change")]
    pub percent_change: Option<Decimal>,

    #[serde(default = "default_funding_rate")]
    pub funding_rate: Option<Decimal>,

    #[serde(default)]
    pub amplitude: Option<Decimal>,

    /// Severity assigned to fired alerts
    #[serde(default = "default_severity")]
    pub severity: String,

    #[serde(default = "default_true")]
    pub console: bool,

    #[serde(default = "default_console_min_severity")]
    pub console_min_severity: String,

    /// JSON-lines alert log (unset = disabled)
    #[serde(default)]
    pub file: Option<PathBuf>,

    #[serde(default = "default_console_min_severity")]
    pub file_min_severity: String,

    /// Requires KLAXON_TELEGRAM_TOKEN and KLAXON_TELEGRAM_CHAT_ID
    #[serde(default)]
    pub telegram: bool,

    #[serde(default = "default_telegram_min_severity")]
    pub telegram_min_severity: String,

    #[serde(default = "default_notify_timeout")]
    pub request_timeout_secs: u64,
}

/// `[analysis]`: one-shot amplitude report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_analysis_bar_count")]
    pub bar_count: u64,

    #[serde(default = "default_analysis_mode")]
    pub amplitude_mode: String,

    /// Ascending bucket edges in percent, starting at 0
    #[serde(default = "default_bucket_edges")]
    pub bucket_edges: Vec<Decimal>,

    #[serde(default = "default_top_n")]
    pub top_n: u64,

    /// Directory for JSON exports (unset = no export)
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
}

/// `[logging]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// EnvFilter directive; RUST_LOG takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

/// `[[instruments]]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub symbol: String,

    #[serde(default = "default_interval")]
    pub interval: String,

    /// Fetch the funding rate; defaults to true on the futures market
    #[serde(default)]
    pub funding: Option<bool>,
}

// Default value functions
fn default_poll_interval() -> u64 {
    60
}

fn default_instrument_pause() -> u64 {
    1_000
}

fn default_monitor_bar_count() -> u64 {
    20
}

fn default_monitor_mode() -> String {
    "range".to_string()
}

fn default_market() -> Market {
    Market::Futures
}

fn default_spot_base_url() -> String {
    SPOT_BASE_URL.to_string()
}

fn default_futures_base_url() -> String {
    FUTURES_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    15
}

fn default_volume_multiplier() -> Option<Decimal> {
    Some(dec!(2.0))
}

fn default_percent_change() -> Option<Decimal> {
    Some(dec!(3.0))
}

fn default_funding_rate() -> Option<Decimal> {
    Some(dec!(0.1))
}

fn default_severity() -> String {
    "warning".to_string()
}

fn default_true() -> bool {
    true
}

fn default_console_min_severity() -> String {
    "info".to_string()
}

fn default_telegram_min_severity() -> String {
    "warning".to_string()
}

fn default_notify_timeout() -> u64 {
    10
}

fn default_analysis_bar_count() -> u64 {
    60
}

fn default_analysis_mode() -> String {
    "down_only".to_string()
}

fn default_bucket_edges() -> Vec<Decimal> {
    vec![dec!(0), dec!(1), dec!(2), dec!(3), dec!(5), dec!(10)]
}

fn default_top_n() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_interval() -> String {
    "5m".to_string()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            instrument_pause_ms: default_instrument_pause(),
            bar_count: default_monitor_bar_count(),
            amplitude_mode: default_monitor_mode(),
            max_cycles: None,
        }
    }
}

impl Default for FetcherSection {
    fn default() -> Self {
        Self {
            market: default_market(),
            spot_base_url: default_spot_base_url(),
            futures_base_url: default_futures_base_url(),
            request_timeout_secs: default_request_timeout(),
            user_agent: None,
        }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            volume_multiplier: default_volume_multiplier(),
            percent_change: default_percent_change(),
            funding_rate: default_funding_rate(),
            amplitude: None,
            severity: default_severity(),
            console: true,
            console_min_severity: default_console_min_severity(),
            file: None,
            file_min_severity: default_console_min_severity(),
            telegram: false,
            telegram_min_severity: default_telegram_min_severity(),
            request_timeout_secs: default_notify_timeout(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bar_count: default_analysis_bar_count(),
            amplitude_mode: default_analysis_mode(),
            bucket_edges: default_bucket_edges(),
            top_n: default_top_n(),
            export_dir: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
