//! Core identity and error types shared by every component

pub mod errors;
pub mod types;

pub use errors::{
    ComputationError, ConfigError, FetchError, MonitorError, NotifyError, ValidationError,
};
pub use types::{Instrument, Interval};
