//! Summary statistics over a sequence of amplitudes

use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub count: usize,
    pub mean: Decimal,
    pub median: Decimal,
    pub max: Decimal,
    pub min: Decimal,
    /// Sample standard deviation (n - 1); 0 for a single value
    pub stdev: Decimal,
    /// max - min
    pub range: Decimal,
}

/// Mean, median, extremes and sample standard deviation
///
/// Returns `None` for an empty input; every other input is total.
pub fn summary_statistics(values: &[Decimal]) -> Option<SummaryStatistics> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort();

    let count = sorted.len();
    let n = Decimal::from(count);
    let min = sorted[0];
    let max = sorted[count - 1];
    let mean = sorted.iter().copied().sum::<Decimal>() / n;

    let median = if count % 2 == 1 {
        sorted[count / 2]
    } else {
        (sorted[count / 2 - 1] + sorted[count / 2]) / Decimal::TWO
    };

    let stdev = if count < 2 {
        Decimal::ZERO
    } else {
        let squared: Decimal = sorted.iter().map(|v| (*v - mean) * (*v - mean)).sum();
        let variance = squared / Decimal::from(count - 1);
        // sqrt is defined for every non-negative value
        variance.sqrt().unwrap_or(Decimal::ZERO)
    };

    Some(SummaryStatistics {
        count,
        mean,
        median,
        max,
        min,
        stdev,
        range: max - min,
    })
}
