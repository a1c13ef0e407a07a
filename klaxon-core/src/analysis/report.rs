//! Amplitude report over one window

use crate::core::Interval;
use crate::data::{Bar, Window};
use crate::metrics::{
    amplitude, amplitude_distribution, percent_change, summary_statistics, AmplitudeDistribution,
    AmplitudeMode, SummaryStatistics,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One bar with its derived values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarDetail {
    /// 1-based position in the window
    pub index: usize,
    pub open_time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    /// `None` when the mode excludes the bar
    pub amplitude: Option<Decimal>,
    /// `None` for a zero open price
    pub percent_change: Option<Decimal>,
}

impl BarDetail {
    fn new(index: usize, bar: &Bar, mode: AmplitudeMode) -> Self {
        Self {
            index,
            open_time: bar.open_time,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            amplitude: amplitude(bar, mode),
            percent_change: percent_change(bar).ok(),
        }
    }
}

/// Coarse label for the mean amplitude
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityGrade {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl VolatilityGrade {
    /// `<1` very low, `<2` low, `<5` moderate, `<10` high, else very high
    pub fn from_mean(mean_amplitude: Decimal) -> Self {
        if mean_amplitude < dec!(1) {
            Self::VeryLow
        } else if mean_amplitude < dec!(2) {
            Self::Low
        } else if mean_amplitude < dec!(5) {
            Self::Moderate
        } else if mean_amplitude < dec!(10) {
            Self::High
        } else {
            Self::VeryHigh
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryLow => "very_low",
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::VeryHigh => "very_high",
        }
    }
}

impl fmt::Display for VolatilityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Amplitude statistics, distribution and extremes for one window
///
/// Bars excluded by the mode (bullish bars under `down_only`) still appear
/// in `bars` but contribute to no statistic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmplitudeReport {
    pub symbol: String,
    pub interval: Interval,
    pub mode: AmplitudeMode,
    /// Bars with a defined amplitude
    pub measured: usize,
    pub bars: Vec<BarDetail>,
    /// `None` when no bar has an amplitude
    pub summary: Option<SummaryStatistics>,
    pub distribution: AmplitudeDistribution,
    pub max_bar: Option<BarDetail>,
    pub min_bar: Option<BarDetail>,
    pub volatility: Option<VolatilityGrade>,
    /// stdev below half the mean
    pub stable: Option<bool>,
}

impl AmplitudeReport {
    pub fn from_window(window: &Window, mode: AmplitudeMode, bucket_edges: &[Decimal]) -> Self {
        let bars: Vec<BarDetail> = window
            .bars()
            .iter()
            .enumerate()
            .map(|(i, bar)| BarDetail::new(i + 1, bar, mode))
            .collect();

        let values: Vec<Decimal> = bars.iter().filter_map(|b| b.amplitude).collect();
        let summary = summary_statistics(&values);

        // First occurrence wins on ties
        let mut max_bar: Option<&BarDetail> = None;
        let mut min_bar: Option<&BarDetail> = None;
        for detail in &bars {
            let Some(value) = detail.amplitude else {
                continue;
            };
            if max_bar.and_then(|b| b.amplitude).map_or(true, |max| value > max) {
                max_bar = Some(detail);
            }
            if min_bar.and_then(|b| b.amplitude).map_or(true, |min| value < min) {
                min_bar = Some(detail);
            }
        }
        let max_bar = max_bar.cloned();
        let min_bar = min_bar.cloned();

        Self {
            symbol: window.instrument().symbol.clone(),
            interval: window.instrument().interval,
            mode,
            measured: values.len(),
            distribution: amplitude_distribution(&values, bucket_edges),
            volatility: summary.map(|s| VolatilityGrade::from_mean(s.mean)),
            stable: summary.map(|s| s.stdev < s.mean / dec!(2)),
            summary,
            max_bar,
            min_bar,
            bars,
        }
    }

    /// Up to `n` measured bars, largest amplitude first (earlier bar on ties)
    pub fn top_by_amplitude(&self, n: usize) -> Vec<&BarDetail> {
        let mut ranked: Vec<&BarDetail> = self.bars.iter().filter(|b| b.amplitude.is_some()).collect();
        ranked.sort_by(|a, b| b.amplitude.cmp(&a.amplitude));
        ranked.truncate(n);
        ranked
    }
}
