//! Alert values produced by rule evaluation
//!
//! An `Alert` is self-contained: it carries the instrument, the bar it refers
//! to and every metric the rule looked at, so any output can render it
//! without going back to the snapshot.

use crate::core::{ConfigError, Interval};
use crate::metrics::MetricSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Informational, no action required
    Info = 0,
    /// Should be looked at
    Warning = 1,
    Error = 2,
    /// Immediate attention
    Critical = 3,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Info => "ℹ️",
            Self::Warning => "⚠️",
            Self::Error => "❌",
            Self::Critical => "🚨",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertSeverity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "critical" => Ok(Self::Critical),
            _ => Err(ConfigError::UnknownSeverity(s.to_string())),
        }
    }
}

/// What a rule watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCategory {
    Volume,
    Price,
    Funding,
    Volatility,
}

impl AlertCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Volume => "VOLUME",
            Self::Price => "PRICE",
            Self::Funding => "FUNDING",
            Self::Volatility => "VOLATILITY",
        }
    }
}

/// One fired rule for one instrument and bar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Name of the rule that fired
    pub rule: String,
    pub category: AlertCategory,
    pub severity: AlertSeverity,
    pub symbol: String,
    pub interval: Interval,
    pub message: String,
    /// Metric name/value pairs in the order the rule added them
    pub details: Vec<(String, String)>,
    pub bar_open_time: i64,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    /// Alert bound to the instrument, bar and evaluation time of `snapshot`
    pub fn from_snapshot(
        snapshot: &MetricSnapshot,
        category: AlertCategory,
        rule: impl Into<String>,
        severity: AlertSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule: rule.into(),
            category,
            severity,
            symbol: snapshot.instrument.symbol.clone(),
            interval: snapshot.instrument.interval,
            message: message.into(),
            details: Vec::new(),
            bar_open_time: snapshot.bar_open_time,
            timestamp: snapshot.evaluated_at,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.push((key.into(), value.to_string()));
        self
    }

    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `CATEGORY.rule`, stable across cycles
    pub fn id(&self) -> String {
        format!("{}.{}", self.category.as_str(), self.rule)
    }

    /// Human readable rendering for console and chat outputs
    pub fn format(&self) -> String {
        let mut output = format!(
            "[{}] {} {} {}@{} - {}",
            self.severity.emoji(),
            self.severity.as_str(),
            self.id(),
            self.symbol,
            self.interval,
            self.message
        );

        if !self.details.is_empty() {
            output.push_str("\n  Details:");
            for (key, value) in &self.details {
                output.push_str(&format!("\n    {}: {}", key, value));
            }
        }

        output
    }

    /// Single-line JSON for structured outputs
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Instrument;
    use crate::metrics::AmplitudeMode;
    use rust_decimal_macros::dec;

    fn snapshot() -> MetricSnapshot {
        MetricSnapshot {
            instrument: Instrument::new("btcusdt", Interval::Minute5),
            bar_open_time: 1_700_000_000_000,
            evaluated_at: Utc::now(),
            last_close: dec!(100),
            amplitude_mode: AmplitudeMode::Range,
            amplitude: Some(dec!(1)),
            percent_change: dec!(0.5),
            average_volume: dec!(10),
            last_volume: dec!(30),
            volume_ratio: dec!(3),
            funding_rate: None,
        }
    }

    #[test]
    fn test_alert_creation() {
        let snap = snapshot();
        let alert = Alert::from_snapshot(
            &snap,
            AlertCategory::Volume,
            "volume_spike",
            AlertSeverity::Warning,
            "Volume spike",
        )
        .with_detail("volume_ratio", "3")
        .with_detail("multiplier", "2");

        assert_eq!(alert.symbol, "BTCUSDT");
        assert_eq!(alert.interval, Interval::Minute5);
        assert_eq!(alert.bar_open_time, snap.bar_open_time);
        assert_eq!(alert.timestamp, snap.evaluated_at);
        assert_eq!(alert.details.len(), 2);
        assert_eq!(alert.detail("multiplier"), Some("2"));
        assert_eq!(alert.id(), "VOLUME.volume_spike");
    }

    #[test]
    fn test_alert_formatting_keeps_detail_order() {
        let alert = Alert::from_snapshot(
            &snapshot(),
            AlertCategory::Price,
            "percent_change",
            AlertSeverity::Error,
            "Price moved",
        )
        .with_detail("z_last", "1")
        .with_detail("a_first", "2");

        let formatted = alert.format();
        assert!(formatted.contains("ERROR"));
        assert!(formatted.contains("PRICE.percent_change"));
        assert!(formatted.contains("BTCUSDT@5m"));
        assert!(formatted.find("z_last").unwrap() < formatted.find("a_first").unwrap());
    }

    #[test]
    fn test_alert_to_json() {
        let alert = Alert::from_snapshot(
            &snapshot(),
            AlertCategory::Funding,
            "funding_rate",
            AlertSeverity::Info,
            "Funding high",
        );

        let json = alert.to_json().unwrap();
        assert!(json.contains("\"rule\":\"funding_rate\""));
        assert!(json.contains("\"category\":\"funding\""));
        assert!(json.contains("\"interval\":\"5m\""));

        let back: Alert = serde_json::from_str(&json).unwrap();
        assert_eq!(back, alert);
    }

    #[test]
    fn test_severity_ordering_and_parse() {
        assert!(AlertSeverity::Info < AlertSeverity::Warning);
        assert!(AlertSeverity::Error < AlertSeverity::Critical);
        assert_eq!("warn".parse::<AlertSeverity>().unwrap(), AlertSeverity::Warning);
        assert_eq!("CRITICAL".parse::<AlertSeverity>().unwrap(), AlertSeverity::Critical);
        assert!("loud".parse::<AlertSeverity>().is_err());
    }
}
