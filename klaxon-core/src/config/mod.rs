//! Configuration: TOML file plus environment secrets
//!
//! The file is read once at startup and validated into immutable runtime
//! values (`RuntimeConfig`). Any problem is a `ConfigError` and stops the
//! process before the first fetch.

pub mod types;

pub use types::*;

use crate::analysis::AnalysisSettings;
use crate::core::{ConfigError, Instrument, Interval};
use crate::data::{clamp_bar_count, FetcherConfig, Market, MAX_BARS};
use crate::engine::MonitorSettings;
use crate::metrics::AmplitudeMode;
use crate::monitoring::{AlertDispatcherConfig, AlertOutput, AlertSeverity, AlertThresholds};
use crate::utils::validate_log_level;
use rust_decimal::Decimal;
use std::path::Path;
use std::time::Duration;

pub const TELEGRAM_TOKEN_ENV: &str = "KLAXON_TELEGRAM_TOKEN";
pub const TELEGRAM_CHAT_ID_ENV: &str = "KLAXON_TELEGRAM_CHAT_ID";

const MAX_POLL_INTERVAL_SECS: u64 = 86_400;
const MAX_INSTRUMENT_PAUSE_MS: u64 = 60_000;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Validated, immutable configuration handed to the components
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub settings: MonitorSettings,
    pub instruments: Vec<Instrument>,
    pub thresholds: AlertThresholds,
    pub fetcher: FetcherConfig,
    pub dispatcher: AlertDispatcherConfig,
    pub analysis: AnalysisSettings,
    pub logging: LoggingConfig,
}

impl KlaxonConfig {
    /// Read and parse a TOML file (no validation)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Validate against the process environment
    pub fn validate(&self) -> Result<RuntimeConfig, ConfigError> {
        self.validate_with_env(|key| std::env::var(key).ok())
    }

    /// Validate with secrets looked up through `env`
    pub fn validate_with_env<E>(&self, env: E) -> Result<RuntimeConfig, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        validate_log_level(&self.logging.level)?;

        Ok(RuntimeConfig {
            settings: self.monitor_settings()?,
            instruments: self.instruments()?,
            thresholds: self.thresholds()?,
            fetcher: self.fetcher_config()?,
            dispatcher: self.dispatcher_config(&env)?,
            analysis: self.analysis_settings()?,
            logging: self.logging.clone(),
        })
    }

    fn monitor_settings(&self) -> Result<MonitorSettings, ConfigError> {
        let monitor = &self.monitor;
        check_range("monitor.poll_interval_secs", monitor.poll_interval_secs, 1, MAX_POLL_INTERVAL_SECS)?;
        check_range("monitor.instrument_pause_ms", monitor.instrument_pause_ms, 0, MAX_INSTRUMENT_PAUSE_MS)?;
        check_range("monitor.bar_count", monitor.bar_count, 2, MAX_BARS as u64)?;
        if let Some(max) = monitor.max_cycles {
            check_range("monitor.max_cycles", max, 1, u64::MAX)?;
        }

        Ok(MonitorSettings {
            poll_interval: Duration::from_secs(monitor.poll_interval_secs),
            instrument_pause: Duration::from_millis(monitor.instrument_pause_ms),
            bar_count: clamp_bar_count(monitor.bar_count as usize),
            amplitude_mode: monitor.amplitude_mode.parse::<AmplitudeMode>()?,
            max_cycles: monitor.max_cycles,
        })
    }

    fn instruments(&self) -> Result<Vec<Instrument>, ConfigError> {
        if self.instruments.is_empty() {
            return Err(ConfigError::NoInstruments);
        }

        let funding_default = self.fetcher.market == Market::Futures;
        self.instruments
            .iter()
            .map(|entry| {
                let symbol = entry.symbol.trim();
                if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
                    return Err(ConfigError::InvalidSymbol(entry.symbol.clone()));
                }
                let interval: Interval = entry.interval.parse()?;
                Ok(Instrument::new(symbol, interval)
                    .with_funding(entry.funding.unwrap_or(funding_default)))
            })
            .collect()
    }

    fn thresholds(&self) -> Result<AlertThresholds, ConfigError> {
        let alerts = &self.alerts;
        Ok(AlertThresholds {
            volume_multiplier: enabled_threshold("alerts.volume_multiplier", alerts.volume_multiplier)?,
            percent_change: enabled_threshold("alerts.percent_change", alerts.percent_change)?,
            funding_rate: enabled_threshold("alerts.funding_rate", alerts.funding_rate)?,
            amplitude: enabled_threshold("alerts.amplitude", alerts.amplitude)?,
            severity: alerts.severity.parse()?,
        })
    }

    fn fetcher_config(&self) -> Result<FetcherConfig, ConfigError> {
        let fetcher = &self.fetcher;
        check_range("fetcher.request_timeout_secs", fetcher.request_timeout_secs, 1, MAX_REQUEST_TIMEOUT_SECS)?;

        let defaults = FetcherConfig::default();
        Ok(FetcherConfig {
            market: fetcher.market,
            spot_base_url: fetcher.spot_base_url.trim_end_matches('/').to_string(),
            futures_base_url: fetcher.futures_base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(fetcher.request_timeout_secs),
            user_agent: fetcher.user_agent.clone().unwrap_or(defaults.user_agent),
        })
    }

    fn dispatcher_config<E>(&self, env: &E) -> Result<AlertDispatcherConfig, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let alerts = &self.alerts;
        check_range("alerts.request_timeout_secs", alerts.request_timeout_secs, 1, MAX_REQUEST_TIMEOUT_SECS)?;

        let mut outputs = Vec::new();
        if alerts.console {
            outputs.push(AlertOutput::Console {
                min_severity: alerts.console_min_severity.parse()?,
            });
        }
        if let Some(path) = &alerts.file {
            outputs.push(AlertOutput::File {
                path: path.clone(),
                min_severity: alerts.file_min_severity.parse()?,
            });
        }
        if alerts.telegram {
            let secret = |key: &'static str| {
                env(key)
                    .filter(|value| !value.trim().is_empty())
                    .ok_or(ConfigError::MissingSecret(key))
            };
            outputs.push(AlertOutput::telegram(
                secret(TELEGRAM_TOKEN_ENV)?,
                secret(TELEGRAM_CHAT_ID_ENV)?,
                alerts.telegram_min_severity.parse::<AlertSeverity>()?,
            ));
        }

        Ok(AlertDispatcherConfig {
            outputs,
            request_timeout: Duration::from_secs(alerts.request_timeout_secs),
        })
    }

    fn analysis_settings(&self) -> Result<AnalysisSettings, ConfigError> {
        let analysis = &self.analysis;
        check_range("analysis.bar_count", analysis.bar_count, 1, MAX_BARS as u64)?;
        check_range("analysis.top_n", analysis.top_n, 1, MAX_BARS as u64)?;
        check_bucket_edges(&analysis.bucket_edges)?;

        Ok(AnalysisSettings {
            bar_count: analysis.bar_count as usize,
            amplitude_mode: analysis.amplitude_mode.parse()?,
            bucket_edges: analysis.bucket_edges.clone(),
            top_n: analysis.top_n as usize,
            export_dir: analysis.export_dir.clone(),
        })
    }
}

fn check_range(name: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Negative is an error, zero disables the rule
fn enabled_threshold(
    name: &'static str,
    value: Option<Decimal>,
) -> Result<Option<Decimal>, ConfigError> {
    match value {
        Some(v) if v.is_sign_negative() && !v.is_zero() => Err(ConfigError::InvalidThreshold {
            name,
            value: v,
            reason: "must not be negative",
        }),
        Some(v) if v.is_zero() => Ok(None),
        other => Ok(other),
    }
}

/// Edges must be non-empty, start at 0 and strictly increase
fn check_bucket_edges(edges: &[Decimal]) -> Result<(), ConfigError> {
    let starts_at_zero = edges.first().is_some_and(|first| first.is_zero());
    let increasing = edges.windows(2).all(|pair| pair[0] < pair[1]);
    if starts_at_zero && increasing {
        Ok(())
    } else {
        Err(ConfigError::InvalidBucketEdges(edges.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const MINIMAL: &str = r#"
        [[instruments]]
        symbol = "btcusdt"
        interval = "15m"
    "#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let runtime = KlaxonConfig::from_toml_str(MINIMAL)
            .unwrap()
            .validate_with_env(no_env)
            .unwrap();

        assert_eq!(runtime.settings.poll_interval, Duration::from_secs(60));
        assert_eq!(runtime.settings.instrument_pause, Duration::from_secs(1));
        assert_eq!(runtime.settings.bar_count, 20);
        assert_eq!(runtime.thresholds.volume_multiplier, Some(dec!(2)));
        assert_eq!(runtime.thresholds.funding_rate, Some(dec!(0.1)));
        assert_eq!(runtime.instruments.len(), 1);
        assert_eq!(runtime.instruments[0].symbol, "BTCUSDT");
        assert_eq!(runtime.instruments[0].interval, Interval::Minute15);
        assert!(runtime.instruments[0].funding, "futures market defaults to funding");
        assert_eq!(runtime.dispatcher.outputs.len(), 1);
        assert_eq!(runtime.analysis.bucket_edges.len(), 6);
        assert_eq!(runtime.analysis.amplitude_mode, AmplitudeMode::DownOnly);
    }

    #[test]
    fn test_unknown_interval_rejected() {
        let config = KlaxonConfig::from_toml_str(
            r#"
            [[instruments]]
            symbol = "ETHUSDT"
            interval = "7m"
        "#,
        )
        .unwrap();

        assert!(matches!(
            config.validate_with_env(no_env),
            Err(ConfigError::UnknownInterval(ref s)) if s == "7m"
        ));
    }

    #[test]
    fn test_empty_instruments_rejected() {
        let config = KlaxonConfig::from_toml_str("[monitor]\npoll_interval_secs = 30\n").unwrap();
        assert!(matches!(config.validate_with_env(no_env), Err(ConfigError::NoInstruments)));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let mut config = KlaxonConfig::from_toml_str(MINIMAL).unwrap();
        config.monitor.poll_interval_secs = 0;

        assert!(matches!(
            config.validate_with_env(no_env),
            Err(ConfigError::OutOfRange { name: "monitor.poll_interval_secs", .. })
        ));
    }

    #[test]
    fn test_bar_count_out_of_range() {
        let mut config = KlaxonConfig::from_toml_str(MINIMAL).unwrap();
        config.monitor.bar_count = 1001;
        assert!(config.validate_with_env(no_env).is_err());
    }

    #[test]
    fn test_thresholds_negative_rejected_zero_disables() {
        let mut config = KlaxonConfig::from_toml_str(MINIMAL).unwrap();
        config.alerts.funding_rate = Some(dec!(0));
        config.alerts.amplitude = Some(dec!(4.5));
        let runtime = config.validate_with_env(no_env).unwrap();
        assert_eq!(runtime.thresholds.funding_rate, None);
        assert_eq!(runtime.thresholds.amplitude, Some(dec!(4.5)));

        config.alerts.percent_change = Some(dec!(-1));
        assert!(matches!(
            config.validate_with_env(no_env),
            Err(ConfigError::InvalidThreshold { name: "alerts.percent_change", .. })
        ));
    }

    #[test]
    fn test_bucket_edges_validation() {
        assert!(check_bucket_edges(&[dec!(0), dec!(1), dec!(5)]).is_ok());
        assert!(check_bucket_edges(&[dec!(0)]).is_ok());
        assert!(check_bucket_edges(&[]).is_err());
        assert!(check_bucket_edges(&[dec!(1), dec!(2)]).is_err());
        assert!(check_bucket_edges(&[dec!(0), dec!(2), dec!(2)]).is_err());
    }

    #[test]
    fn test_telegram_requires_secrets() {
        let mut config = KlaxonConfig::from_toml_str(MINIMAL).unwrap();
        config.alerts.telegram = true;

        assert!(matches!(
            config.validate_with_env(no_env),
            Err(ConfigError::MissingSecret(TELEGRAM_TOKEN_ENV))
        ));

        let runtime = config
            .validate_with_env(|key| match key {
                TELEGRAM_TOKEN_ENV => Some("123:abc".to_string()),
                TELEGRAM_CHAT_ID_ENV => Some("-100200".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(runtime.dispatcher.outputs.len(), 2);
        assert_eq!(runtime.dispatcher.outputs[1].kind(), "telegram");
    }

    #[test]
    fn test_spot_market_disables_funding_by_default() {
        let config = KlaxonConfig::from_toml_str(
            r#"
            [fetcher]
            market = "spot"

            [[instruments]]
            symbol = "SOLUSDT"

            [[instruments]]
            symbol = "BNBUSDT"
            funding = true
        "#,
        )
        .unwrap();

        let runtime = config.validate_with_env(no_env).unwrap();
        assert!(!runtime.instruments[0].funding);
        assert!(runtime.instruments[1].funding);
        assert_eq!(runtime.instruments[0].interval, Interval::Minute5);
    }

    #[test]
    fn test_invalid_symbol_and_mode() {
        let mut config = KlaxonConfig::from_toml_str(MINIMAL).unwrap();
        config.instruments[0].symbol = "BTC/USDT".to_string();
        assert!(matches!(config.validate_with_env(no_env), Err(ConfigError::InvalidSymbol(_))));

        let mut config = KlaxonConfig::from_toml_str(MINIMAL).unwrap();
        config.monitor.amplitude_mode = "wide".to_string();
        assert!(matches!(
            config.validate_with_env(no_env),
            Err(ConfigError::UnknownAmplitudeMode(_))
        ));
    }

    #[test]
    fn test_parse_error_and_missing_file() {
        assert!(matches!(
            KlaxonConfig::from_toml_str("[monitor\n"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            KlaxonConfig::from_file("/nonexistent/klaxon.toml"),
            Err(ConfigError::Read { .. })
        ));
    }
}
