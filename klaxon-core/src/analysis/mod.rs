//! One-shot amplitude analysis and JSON export

pub mod export;
pub mod report;

pub use export::{export_file_name, write_snapshot, write_snapshot_at};
pub use report::{AmplitudeReport, BarDetail, VolatilityGrade};

use crate::metrics::AmplitudeMode;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::path::PathBuf;

/// Runtime parameters for the amplitude report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisSettings {
    pub bar_count: usize,
    pub amplitude_mode: AmplitudeMode,
    /// Ascending, starting at 0
    pub bucket_edges: Vec<Decimal>,
    pub top_n: usize,
    pub export_dir: Option<PathBuf>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            bar_count: 60,
            amplitude_mode: AmplitudeMode::DownOnly,
            bucket_edges: vec![dec!(0), dec!(1), dec!(2), dec!(3), dec!(5), dec!(10)],
            top_n: 10,
            export_dir: None,
        }
    }
}
