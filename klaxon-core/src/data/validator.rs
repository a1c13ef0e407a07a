//! Centralized bar validation logic
//!
//! Single validation point for everything the fetcher hands to the metric
//! engine: a bar that passes here can be divided by its own prices without
//! surprises other than the documented zero guards.

use super::types::Bar;
use crate::core::ValidationError;
use rust_decimal::Decimal;

/// Check `high ≥ max(open, close) ≥ min(open, close) ≥ low ≥ 0` and `volume ≥ 0`
pub fn validate_bar(bar: &Bar) -> Result<(), ValidationError> {
    for (field, value) in [
        ("open", bar.open),
        ("high", bar.high),
        ("low", bar.low),
        ("close", bar.close),
        ("volume", bar.volume),
    ] {
        if value < Decimal::ZERO {
            return Err(ValidationError::Negative {
                open_time: bar.open_time,
                field,
                value,
            });
        }
    }

    let body_top = bar.open.max(bar.close);
    let body_bottom = bar.open.min(bar.close);
    if bar.high < body_top || bar.low > body_bottom {
        return Err(ValidationError::InconsistentPrices {
            open_time: bar.open_time,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
        });
    }

    Ok(())
}

/// Check open times are strictly increasing
pub fn validate_sequence(bars: &[Bar]) -> Result<(), ValidationError> {
    for pair in bars.windows(2) {
        if pair[1].open_time <= pair[0].open_time {
            return Err(ValidationError::NonIncreasingOpenTime {
                previous: pair[0].open_time,
                current: pair[1].open_time,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::BarBuilder;
    use rust_decimal_macros::dec;

    #[test]
    fn test_valid_bar_passes() {
        let bar = BarBuilder::at(0).ohlc(dec!(100), dec!(110), dec!(98), dec!(105)).build();
        assert!(validate_bar(&bar).is_ok());
    }

    #[test]
    fn test_flat_bar_passes() {
        let bar = BarBuilder::at(0).ohlc(dec!(1), dec!(1), dec!(1), dec!(1)).build();
        assert!(validate_bar(&bar).is_ok());
    }

    #[test]
    fn test_high_below_close_rejected() {
        let bar = BarBuilder::at(7).ohlc(dec!(100), dec!(104), dec!(98), dec!(105)).build();
        assert!(matches!(
            validate_bar(&bar),
            Err(ValidationError::InconsistentPrices { open_time: 420_000, .. })
        ));
    }

    #[test]
    fn test_low_above_open_rejected() {
        let bar = BarBuilder::at(0).ohlc(dec!(100), dec!(110), dec!(101), dec!(105)).build();
        assert!(validate_bar(&bar).is_err());
    }

    #[test]
    fn test_negative_volume_rejected() {
        let bar = BarBuilder::at(0).volume(dec!(-1)).build();
        assert!(matches!(
            validate_bar(&bar),
            Err(ValidationError::Negative { field: "volume", .. })
        ));
    }

    #[test]
    fn test_zero_low_is_valid() {
        // Zero prices are a metric concern, not a validation failure
        let bar = BarBuilder::at(0).ohlc(dec!(0), dec!(1), dec!(0), dec!(0.5)).build();
        assert!(validate_bar(&bar).is_ok());
    }

    #[test]
    fn test_duplicate_open_time_rejected() {
        let bars = [BarBuilder::at(5).build(), BarBuilder::at(5).build()];
        assert_eq!(
            validate_sequence(&bars),
            Err(ValidationError::NonIncreasingOpenTime {
                previous: 5 * 60_000,
                current: 5 * 60_000
            })
        );
    }
}
