//! MonitorLoop: fetch -> metrics -> rules -> notify, forever

pub mod monitor;

pub use monitor::{CycleReport, MonitorLoop, MonitorSettings, MonitorStats};
