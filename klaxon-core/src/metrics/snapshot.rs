use super::price::{amplitude, percent_change, AmplitudeMode};
use super::volume::{average_change_volume, volume_ratio};
use crate::core::{ComputationError, Instrument};
use crate::data::Window;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Derived metrics for the most recent bar of one window
///
/// Built once per instrument per cycle and dropped after rule evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub instrument: Instrument,
    /// Open time of the bar the metrics describe
    pub bar_open_time: i64,
    pub evaluated_at: DateTime<Utc>,
    pub last_close: Decimal,
    pub amplitude_mode: AmplitudeMode,
    /// `None` when the mode excludes the bar
    pub amplitude: Option<Decimal>,
    pub percent_change: Decimal,
    /// Mean volume excluding the last bar
    pub average_volume: Decimal,
    pub last_volume: Decimal,
    pub volume_ratio: Decimal,
    /// Percent; `None` when not fetched or unavailable
    pub funding_rate: Option<Decimal>,
}

impl MetricSnapshot {
    /// Compute every metric for `window`'s last bar
    ///
    /// `evaluated_at` is passed in so the same inputs always give the same
    /// snapshot.
    pub fn from_window(
        window: &Window,
        mode: AmplitudeMode,
        funding_rate: Option<Decimal>,
        evaluated_at: DateTime<Utc>,
    ) -> Result<Self, ComputationError> {
        let last = window.last().ok_or(ComputationError::EmptyWindow)?;

        Ok(Self {
            instrument: window.instrument().clone(),
            bar_open_time: last.open_time,
            evaluated_at,
            last_close: last.close,
            amplitude_mode: mode,
            amplitude: amplitude(last, mode),
            percent_change: percent_change(last)?,
            average_volume: average_change_volume(window, true),
            last_volume: last.volume,
            volume_ratio: volume_ratio(window),
            funding_rate,
        })
    }
}
