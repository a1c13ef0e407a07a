//! Klaxon Core - K-line market monitor and amplitude analyzer
//!
//! Polls exchange candlestick data for a fixed list of instruments, derives
//! per-bar statistics and fires threshold alerts.
//!
//! ## Architecture
//! - **SeriesFetcher** (`data`): async trait returning a validated `Window`
//! - **MetricEngine** (`metrics`): pure functions, no I/O, no state
//! - **MonitorLoop** (`engine`): fetch -> snapshot -> rules -> notify -> sleep
//! - **Alerting** (`monitoring`): rules, alerts and the `Notifier` trait
//!
//! Every price, volume and percentage is a `rust_decimal::Decimal`.
//!
//! ## Core Modules
//! - `core`: instrument identity and error types
//! - `config`: TOML configuration, validated once at startup
//! - `analysis`: amplitude reports and JSON export
//! - `resilience`: kill switch and panic hook
//! - `testing`: scripted fetcher, recording notifier, bar builders

pub mod analysis;
pub mod config;
pub mod core;
pub mod data;
pub mod engine;
pub mod metrics;
pub mod monitoring;
pub mod resilience;
pub mod testing;
pub mod utils;

pub use core::{
    ComputationError, ConfigError, FetchError, Instrument, Interval, MonitorError, NotifyError,
    ValidationError,
};
pub use data::{Bar, BinanceFetcher, SeriesFetcher, Window};
pub use engine::{CycleReport, MonitorLoop, MonitorSettings, MonitorStats};
pub use metrics::{AmplitudeMode, MetricSnapshot};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::analysis::{AmplitudeReport, AnalysisSettings};
    pub use crate::config::{KlaxonConfig, RuntimeConfig};
    pub use crate::core::{Instrument, Interval};
    pub use crate::data::{Bar, BinanceFetcher, FetcherConfig, SeriesFetcher, Window};
    pub use crate::engine::{MonitorLoop, MonitorSettings, MonitorStats};
    pub use crate::metrics::{AmplitudeMode, MetricSnapshot};
    pub use crate::monitoring::{Alert, AlertDispatcher, AlertThresholds, Notifier, RuleSet};
    pub use crate::resilience::{install_panic_handler, KillSwitch};
}
