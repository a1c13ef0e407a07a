//! Volume metrics over a window

use crate::data::{Bar, Window};
use rust_decimal::Decimal;

/// Arithmetic mean of bar volumes
///
/// With `exclude_last` the most recent (provisional) bar is left out so the
/// live bar is never compared against an average that contains itself.
/// An empty set averages to 0.
pub fn average_change_volume(window: &Window, exclude_last: bool) -> Decimal {
    let bars = if exclude_last {
        window.history()
    } else {
        window.bars()
    };
    mean_volume(bars)
}

/// `last.volume / mean(volume of all but last)`, 0 when that mean is 0
pub fn volume_ratio(window: &Window) -> Decimal {
    let Some(last) = window.last() else {
        return Decimal::ZERO;
    };

    let average = average_change_volume(window, true);
    if average.is_zero() {
        Decimal::ZERO
    } else {
        last.volume / average
    }
}

fn mean_volume(bars: &[Bar]) -> Decimal {
    if bars.is_empty() {
        return Decimal::ZERO;
    }
    let total: Decimal = bars.iter().map(|b| b.volume).sum();
    total / Decimal::from(bars.len())
}
