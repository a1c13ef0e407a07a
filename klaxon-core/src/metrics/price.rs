//! Per-bar price metrics: percent change and amplitude

use crate::core::{ComputationError, ConfigError};
use crate::data::Bar;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a bar's amplitude is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmplitudeMode {
    /// `(high - low) / low * 100`
    Range,
    /// `(open - low) / open * 100`, bearish bars only
    DownOnly,
    /// `(high - low) / open * 100`
    OpenRange,
}

impl AmplitudeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Range => "range",
            Self::DownOnly => "down_only",
            Self::OpenRange => "open_range",
        }
    }
}

impl fmt::Display for AmplitudeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AmplitudeMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "range" => Ok(Self::Range),
            "down_only" => Ok(Self::DownOnly),
            "open_range" => Ok(Self::OpenRange),
            other => Err(ConfigError::UnknownAmplitudeMode(other.to_string())),
        }
    }
}

/// `(close - open) / open * 100`
///
/// A zero open price is reported, never mapped to 0 or infinity.
pub fn percent_change(bar: &Bar) -> Result<Decimal, ComputationError> {
    if bar.open.is_zero() {
        return Err(ComputationError::ZeroOpenPrice {
            open_time: bar.open_time,
        });
    }
    Ok((bar.close - bar.open) / bar.open * Decimal::ONE_HUNDRED)
}

/// Amplitude of one bar in percent
///
/// Returns `None` when the mode excludes the bar (`DownOnly` on a bar that
/// did not close below its open). A zero denominator yields 0.
pub fn amplitude(bar: &Bar, mode: AmplitudeMode) -> Option<Decimal> {
    match mode {
        AmplitudeMode::Range => Some(ratio_pct(bar.high - bar.low, bar.low)),
        AmplitudeMode::DownOnly => {
            if bar.is_bearish() {
                Some(ratio_pct(bar.open - bar.low, bar.open))
            } else {
                None
            }
        }
        AmplitudeMode::OpenRange => Some(ratio_pct(bar.high - bar.low, bar.open)),
    }
}

/// Defined amplitudes of `bars`, in bar order
pub fn amplitudes(bars: &[Bar], mode: AmplitudeMode) -> Vec<Decimal> {
    bars.iter().filter_map(|bar| amplitude(bar, mode)).collect()
}

#[inline]
fn ratio_pct(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator / denominator * Decimal::ONE_HUNDRED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::BarBuilder;
    use rust_decimal_macros::dec;

    #[test]
    fn test_percent_change() {
        let bar = BarBuilder::at(0).ohlc(dec!(100), dec!(110), dec!(98), dec!(105)).build();
        assert_eq!(percent_change(&bar).unwrap(), dec!(5));

        let down = BarBuilder::at(0).ohlc(dec!(200), dec!(200), dec!(150), dec!(150)).build();
        assert_eq!(percent_change(&down).unwrap(), dec!(-25));
    }

    #[test]
    fn test_percent_change_zero_open_is_error() {
        let bar = BarBuilder::at(3).ohlc(dec!(0), dec!(1), dec!(0), dec!(1)).build();
        assert_eq!(
            percent_change(&bar),
            Err(ComputationError::ZeroOpenPrice { open_time: 3 * 60_000 })
        );
    }

    #[test]
    fn test_range_amplitude() {
        let bar = BarBuilder::at(0).ohlc(dec!(105), dec!(110), dec!(100), dec!(102)).build();
        assert_eq!(amplitude(&bar, AmplitudeMode::Range), Some(dec!(10)));
    }

    #[test]
    fn test_range_amplitude_zero_low_guard() {
        let bar = BarBuilder::at(0).ohlc(dec!(1), dec!(2), dec!(0), dec!(1)).build();
        assert_eq!(amplitude(&bar, AmplitudeMode::Range), Some(Decimal::ZERO));
    }

    #[test]
    fn test_down_only_bearish_bar() {
        let bar = BarBuilder::at(0).ohlc(dec!(100), dec!(105), dec!(90), dec!(95)).build();
        assert_eq!(amplitude(&bar, AmplitudeMode::DownOnly), Some(dec!(10)));
    }

    #[test]
    fn test_down_only_excludes_bullish_and_flat() {
        let bullish = BarBuilder::at(0).ohlc(dec!(100), dec!(110), dec!(98), dec!(105)).build();
        assert_eq!(amplitude(&bullish, AmplitudeMode::DownOnly), None);

        let doji = BarBuilder::at(0).ohlc(dec!(100), dec!(101), dec!(99), dec!(100)).build();
        assert_eq!(amplitude(&doji, AmplitudeMode::DownOnly), None);
    }

    #[test]
    fn test_open_range_amplitude() {
        let bar = BarBuilder::at(0).ohlc(dec!(50), dec!(55), dec!(45), dec!(52)).build();
        assert_eq!(amplitude(&bar, AmplitudeMode::OpenRange), Some(dec!(20)));
    }

    #[test]
    fn test_amplitudes_skip_excluded_bars() {
        let bars = [
            BarBuilder::at(0).ohlc(dec!(100), dec!(105), dec!(90), dec!(95)).build(),
            BarBuilder::at(1).ohlc(dec!(100), dec!(110), dec!(98), dec!(105)).build(),
            BarBuilder::at(2).ohlc(dec!(100), dec!(100), dec!(96), dec!(97)).build(),
        ];
        assert_eq!(amplitudes(&bars, AmplitudeMode::DownOnly), vec![dec!(10), dec!(4)]);
        assert_eq!(amplitudes(&bars, AmplitudeMode::Range).len(), 3);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("down_only".parse::<AmplitudeMode>().unwrap(), AmplitudeMode::DownOnly);
        assert!(matches!(
            "down".parse::<AmplitudeMode>(),
            Err(ConfigError::UnknownAmplitudeMode(_))
        ));
    }
}
