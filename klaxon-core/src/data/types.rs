use super::validator::{validate_bar, validate_sequence};
use crate::core::{Instrument, ValidationError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Maximum bars the source API returns per request
pub const MAX_BARS: usize = 1000;

/// One candlestick
///
/// Prices and volume are kept as `Decimal` exactly as the exchange sent them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    /// Open time, epoch milliseconds
    pub open_time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    /// Last millisecond covered by this bar
    pub close_time: i64,
}

impl Bar {
    /// close < open
    #[inline]
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Whether the bar's period has not finished at `now_ms`
    #[inline]
    pub fn is_open_at(&self, now_ms: i64) -> bool {
        now_ms <= self.close_time
    }
}

/// The most recent bars for one instrument, oldest first
///
/// The last bar may still be forming; metrics that compare "now" against
/// history treat it as provisional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    instrument: Instrument,
    bars: Vec<Bar>,
}

impl Window {
    /// Build a window, enforcing bar invariants, strictly increasing open
    /// times and the `MAX_BARS` cap
    pub fn new(instrument: Instrument, bars: Vec<Bar>) -> Result<Self, ValidationError> {
        if bars.len() > MAX_BARS {
            return Err(ValidationError::WindowTooLong {
                len: bars.len(),
                max: MAX_BARS,
            });
        }
        for bar in &bars {
            validate_bar(bar)?;
        }
        validate_sequence(&bars)?;

        Ok(Self { instrument, bars })
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Most recent (possibly provisional) bar
    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Every bar except the most recent one
    pub fn history(&self) -> &[Bar] {
        match self.bars.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}
