//! MetricEngine: pure functions over bars and windows
//!
//! Nothing in this module performs I/O or keeps state between calls, so the
//! same window always yields the same numbers. Division by zero is guarded
//! with documented sentinels (0) except a zero open price in
//! `percent_change`, which is surfaced as `ComputationError::ZeroOpenPrice`.
//!
//! - `price`: percent change and amplitude (range / down_only / open_range)
//! - `volume`: average volume and volume spike ratio
//! - `distribution`: amplitude buckets
//! - `stats`: mean, median, extremes, sample standard deviation
//! - `snapshot`: per-cycle `MetricSnapshot` fed to the alert rules

pub mod distribution;
pub mod price;
pub mod snapshot;
pub mod stats;
pub mod volume;

pub use distribution::{amplitude_distribution, AmplitudeDistribution, Bucket};
pub use price::{amplitude, amplitudes, percent_change, AmplitudeMode};
pub use snapshot::MetricSnapshot;
pub use stats::{summary_statistics, SummaryStatistics};
pub use volume::{average_change_volume, volume_ratio};
