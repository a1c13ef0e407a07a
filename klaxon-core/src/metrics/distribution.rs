//! Amplitude distribution over half-open buckets

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One `[lower, upper)` bucket; `upper == None` is unbounded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub label: String,
    pub lower: Decimal,
    pub upper: Option<Decimal>,
    pub count: usize,
    /// Share of all amplitudes, in percent
    pub percentage: Decimal,
}

impl Bucket {
    #[inline]
    fn contains(&self, value: Decimal) -> bool {
        value >= self.lower && self.upper.map_or(true, |upper| value < upper)
    }
}

/// Buckets in ascending order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AmplitudeDistribution {
    pub buckets: Vec<Bucket>,
    pub total: usize,
}

impl AmplitudeDistribution {
    pub fn get(&self, label: &str) -> Option<&Bucket> {
        self.buckets.iter().find(|b| b.label == label)
    }

    pub fn counts(&self) -> Vec<usize> {
        self.buckets.iter().map(|b| b.count).collect()
    }

    pub fn percentage_sum(&self) -> Decimal {
        self.buckets.iter().map(|b| b.percentage).sum()
    }
}

/// Partition `amplitudes` into buckets delimited by ascending `bucket_edges`
///
/// Edges `[0, 1, 2, 5]` produce `[0,1) [1,2) [2,5) [5,∞)`. Values below the
/// first edge land in no bucket but still count toward the total, so callers
/// that want percentages to sum to 100 start the edges at 0.
pub fn amplitude_distribution(amplitudes: &[Decimal], bucket_edges: &[Decimal]) -> AmplitudeDistribution {
    let total = amplitudes.len();

    let mut buckets: Vec<Bucket> = bucket_edges
        .iter()
        .enumerate()
        .map(|(i, &lower)| {
            let upper = bucket_edges.get(i + 1).copied();
            Bucket {
                label: bucket_label(lower, upper),
                lower,
                upper,
                count: 0,
                percentage: Decimal::ZERO,
            }
        })
        .collect();

    for &value in amplitudes {
        if let Some(bucket) = buckets.iter_mut().find(|b| b.contains(value)) {
            bucket.count += 1;
        }
    }

    if total > 0 {
        let total_dec = Decimal::from(total);
        for bucket in &mut buckets {
            bucket.percentage = Decimal::from(bucket.count) * Decimal::ONE_HUNDRED / total_dec;
        }
    }

    AmplitudeDistribution { buckets, total }
}

fn bucket_label(lower: Decimal, upper: Option<Decimal>) -> String {
    match upper {
        Some(upper) => format!("{}-{}%", lower.normalize(), upper.normalize()),
        None => format!(">{}%", lower.normalize()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn edges() -> Vec<Decimal> {
        vec![dec!(0), dec!(1), dec!(2), dec!(5)]
    }

    #[test]
    fn test_distribution_counts_and_percentages() {
        let dist = amplitude_distribution(&[dec!(0.5), dec!(1.5), dec!(1.5), dec!(6.0)], &edges());

        assert_eq!(dist.counts(), vec![1, 2, 0, 1]);
        assert_eq!(dist.percentage_sum(), dec!(100));
        assert_eq!(dist.get("1-2%").unwrap().percentage, dec!(50));
        assert_eq!(dist.get(">5%").unwrap().count, 1);
        assert_eq!(dist.total, 4);
    }

    #[test]
    fn test_bucket_boundaries_are_half_open() {
        let dist = amplitude_distribution(&[dec!(1), dec!(2), dec!(5)], &edges());
        assert_eq!(dist.counts(), vec![0, 1, 1, 1]);
    }

    #[test]
    fn test_empty_amplitudes() {
        let dist = amplitude_distribution(&[], &edges());
        assert_eq!(dist.counts(), vec![0, 0, 0, 0]);
        assert_eq!(dist.percentage_sum(), Decimal::ZERO);
        assert_eq!(dist.buckets.len(), 4);
    }

    #[test]
    fn test_labels() {
        let dist = amplitude_distribution(&[], &[dec!(0), dec!(0.5), dec!(10)]);
        let labels: Vec<&str> = dist.buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["0-0.5%", "0.5-10%", ">10%"]);
    }
}
