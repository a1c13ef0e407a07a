//! Alerting: rules over metric snapshots and delivery of the alerts they fire

pub mod alert_rules;
pub mod alerts;
pub mod notifier;

pub use alert_rules::{
    AlertRule, AlertThresholds, AmplitudeRule, FundingRateRule, PercentChangeRule, RuleSet,
    VolumeSpikeRule,
};
pub use alerts::{Alert, AlertCategory, AlertSeverity};
pub use notifier::{
    AlertDispatcher, AlertDispatcherConfig, AlertOutput, Notifier, TELEGRAM_API_BASE,
};
