//! Builders for bars and windows used across unit and integration tests

use crate::core::{Instrument, Interval};
use crate::data::{Bar, Window};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Length of one test bar (1m)
pub const BAR_MILLIS: i64 = 60_000;

/// Builder for a single 1m bar
///
/// Defaults to a quiet bar: open 100, high 101, low 99, close 100, volume 10.
#[derive(Debug, Clone, Copy)]
pub struct BarBuilder {
    bar: Bar,
}

impl BarBuilder {
    /// Bar number `index` of a 1m series starting at epoch 0
    pub fn at(index: i64) -> Self {
        let open_time = index * BAR_MILLIS;
        Self {
            bar: Bar {
                open_time,
                open: dec!(100),
                high: dec!(101),
                low: dec!(99),
                close: dec!(100),
                volume: dec!(10),
                close_time: open_time + BAR_MILLIS - 1,
            },
        }
    }

    pub fn ohlc(mut self, open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Self {
        self.bar.open = open;
        self.bar.high = high;
        self.bar.low = low;
        self.bar.close = close;
        self
    }

    pub fn volume(mut self, volume: Decimal) -> Self {
        self.bar.volume = volume;
        self
    }

    pub fn build(self) -> Bar {
        self.bar
    }
}

/// Consecutive quiet bars with the given volumes
pub fn bars_with_volumes(volumes: &[Decimal]) -> Vec<Bar> {
    volumes
        .iter()
        .enumerate()
        .map(|(i, v)| BarBuilder::at(i as i64).volume(*v).build())
        .collect()
}

/// Consecutive bars from `(open, high, low, close)` tuples
pub fn bars_from_ohlc(prices: &[(Decimal, Decimal, Decimal, Decimal)]) -> Vec<Bar> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| BarBuilder::at(i as i64).ohlc(o, h, l, c).build())
        .collect()
}

/// 1m window for `symbol` with the given volumes
///
/// Panics if the bars are invalid; test input only.
pub fn window_with_volumes(symbol: &str, volumes: &[Decimal]) -> Window {
    window_of(symbol, bars_with_volumes(volumes))
}

/// 1m window for `symbol` over `bars`
pub fn window_of(symbol: &str, bars: Vec<Bar>) -> Window {
    Window::new(Instrument::new(symbol, Interval::Minute1), bars)
        .unwrap_or_else(|e| panic!("invalid test window for {}: {}", symbol, e))
}

/// `count - 1` bars at `base` volume followed by one at `last`
pub fn spike_volumes(count: usize, base: Decimal, last: Decimal) -> Vec<Decimal> {
    let mut volumes = vec![base; count.saturating_sub(1)];
    volumes.push(last);
    volumes
}
