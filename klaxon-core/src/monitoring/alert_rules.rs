//! Threshold rules evaluated against each `MetricSnapshot`
//!
//! Rules are stateless: the same snapshot always produces the same alerts,
//! and nothing is remembered between cycles (no hysteresis, no debounce).
//! All comparisons are strict, so a value exactly at its threshold does not
//! fire.

use super::alerts::{Alert, AlertCategory, AlertSeverity};
use crate::metrics::MetricSnapshot;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

/// Alert rule trait
pub trait AlertRule: Send + Sync {
    /// Rule name for identification
    fn name(&self) -> &str;

    fn category(&self) -> AlertCategory;

    /// Evaluate rule and return an alert if it fires
    fn evaluate(&self, snapshot: &MetricSnapshot) -> Option<Alert>;
}

/// Runtime thresholds; `None` disables the corresponding rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertThresholds {
    /// Fires when `volume_ratio > multiplier`
    pub volume_multiplier: Option<Decimal>,
    /// Percent; fires when `|percent_change| > threshold`
    pub percent_change: Option<Decimal>,
    /// Percent; fires when `|funding_rate| > threshold`
    pub funding_rate: Option<Decimal>,
    /// Percent; fires when `amplitude > threshold`
    pub amplitude: Option<Decimal>,
    pub severity: AlertSeverity,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            volume_multiplier: Some(dec!(2.0)),
            percent_change: Some(dec!(3.0)),
            funding_rate: Some(dec!(0.1)),
            amplitude: None,
            severity: AlertSeverity::Warning,
        }
    }
}

/// Last bar volume against the historical average
pub struct VolumeSpikeRule {
    pub multiplier: Decimal,
    pub severity: AlertSeverity,
}

impl VolumeSpikeRule {
    pub fn new(multiplier: Decimal, severity: AlertSeverity) -> Self {
        Self {
            multiplier,
            severity,
        }
    }
}

impl AlertRule for VolumeSpikeRule {
    fn name(&self) -> &str {
        "volume_spike"
    }

    fn category(&self) -> AlertCategory {
        AlertCategory::Volume
    }

    fn evaluate(&self, snapshot: &MetricSnapshot) -> Option<Alert> {
        if snapshot.volume_ratio <= self.multiplier {
            return None;
        }

        let alert = Alert::from_snapshot(
            snapshot,
            self.category(),
            self.name(),
            self.severity,
            format!(
                "Volume {}x average ({} vs {})",
                snapshot.volume_ratio.round_dp(2),
                snapshot.last_volume,
                snapshot.average_volume.round_dp(4)
            ),
        )
        .with_detail("volume_ratio", snapshot.volume_ratio.round_dp(4))
        .with_detail("multiplier", self.multiplier)
        .with_detail("last_volume", snapshot.last_volume)
        .with_detail("average_volume", snapshot.average_volume.round_dp(4))
        .with_detail("last_close", snapshot.last_close);

        Some(alert)
    }
}

/// Open-to-close move of the last bar, either direction
pub struct PercentChangeRule {
    pub threshold: Decimal,
    pub severity: AlertSeverity,
}

impl PercentChangeRule {
    pub fn new(threshold: Decimal, severity: AlertSeverity) -> Self {
        Self {
            threshold,
            severity,
        }
    }
}

impl AlertRule for PercentChangeRule {
    fn name(&self) -> &str {
        "percent_change"
    }

    fn category(&self) -> AlertCategory {
        AlertCategory::Price
    }

    fn evaluate(&self, snapshot: &MetricSnapshot) -> Option<Alert> {
        let change = snapshot.percent_change;
        if change.abs() <= self.threshold {
            return None;
        }

        let direction = if change.is_sign_negative() { "down" } else { "up" };
        let alert = Alert::from_snapshot(
            snapshot,
            self.category(),
            self.name(),
            self.severity,
            format!("Price {} {}%", direction, change.abs().round_dp(2)),
        )
        .with_detail("percent_change", change.round_dp(4))
        .with_detail("threshold", self.threshold)
        .with_detail("last_close", snapshot.last_close);

        Some(alert)
    }
}

/// Perpetual funding rate magnitude
pub struct FundingRateRule {
    pub threshold: Decimal,
    pub severity: AlertSeverity,
}

impl FundingRateRule {
    pub fn new(threshold: Decimal, severity: AlertSeverity) -> Self {
        Self {
            threshold,
            severity,
        }
    }
}

impl AlertRule for FundingRateRule {
    fn name(&self) -> &str {
        "funding_rate"
    }

    fn category(&self) -> AlertCategory {
        AlertCategory::Funding
    }

    fn evaluate(&self, snapshot: &MetricSnapshot) -> Option<Alert> {
        let rate = snapshot.funding_rate?;
        if rate.abs() <= self.threshold {
            return None;
        }

        let alert = Alert::from_snapshot(
            snapshot,
            self.category(),
            self.name(),
            self.severity,
            format!("Funding rate {}%", rate.round_dp(4)),
        )
        .with_detail("funding_rate", rate)
        .with_detail("threshold", self.threshold);

        Some(alert)
    }
}

/// Intra-bar amplitude of the last bar
pub struct AmplitudeRule {
    pub threshold: Decimal,
    pub severity: AlertSeverity,
}

impl AmplitudeRule {
    pub fn new(threshold: Decimal, severity: AlertSeverity) -> Self {
        Self {
            threshold,
            severity,
        }
    }
}

impl AlertRule for AmplitudeRule {
    fn name(&self) -> &str {
        "amplitude"
    }

    fn category(&self) -> AlertCategory {
        AlertCategory::Volatility
    }

    fn evaluate(&self, snapshot: &MetricSnapshot) -> Option<Alert> {
        let amplitude = snapshot.amplitude?;
        if amplitude <= self.threshold {
            return None;
        }

        let alert = Alert::from_snapshot(
            snapshot,
            self.category(),
            self.name(),
            self.severity,
            format!(
                "Amplitude {}% ({})",
                amplitude.round_dp(2),
                snapshot.amplitude_mode
            ),
        )
        .with_detail("amplitude", amplitude.round_dp(4))
        .with_detail("mode", snapshot.amplitude_mode)
        .with_detail("threshold", self.threshold);

        Some(alert)
    }
}

/// Ordered collection of rules
///
/// Every firing rule yields its own alert, in rule order.
#[derive(Default)]
pub struct RuleSet {
    rules: Vec<Box<dyn AlertRule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// One rule per enabled threshold: volume, price, funding, amplitude
    pub fn from_config(thresholds: &AlertThresholds) -> Self {
        let mut set = Self::new();
        let severity = thresholds.severity;

        if let Some(multiplier) = thresholds.volume_multiplier {
            set.add_rule(Box::new(VolumeSpikeRule::new(multiplier, severity)));
        }
        if let Some(threshold) = thresholds.percent_change {
            set.add_rule(Box::new(PercentChangeRule::new(threshold, severity)));
        }
        if let Some(threshold) = thresholds.funding_rate {
            set.add_rule(Box::new(FundingRateRule::new(threshold, severity)));
        }
        if let Some(threshold) = thresholds.amplitude {
            set.add_rule(Box::new(AmplitudeRule::new(threshold, severity)));
        }

        set
    }

    pub fn add_rule(&mut self, rule: Box<dyn AlertRule>) {
        debug!("Adding alert rule: {}", rule.name());
        self.rules.push(rule);
    }

    pub fn with_rule(mut self, rule: Box<dyn AlertRule>) -> Self {
        self.add_rule(rule);
        self
    }

    /// Evaluate every rule against `snapshot`
    pub fn evaluate(&self, snapshot: &MetricSnapshot) -> Vec<Alert> {
        self.rules
            .iter()
            .filter_map(|rule| {
                let alert = rule.evaluate(snapshot);
                if let Some(alert) = &alert {
                    debug!(symbol = %alert.symbol, "Alert triggered: {}", alert.id());
                }
                alert
            })
            .collect()
    }

    /// Whether any rule reads the funding rate
    pub fn needs_funding(&self) -> bool {
        self.rules
            .iter()
            .any(|rule| rule.category() == AlertCategory::Funding)
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
