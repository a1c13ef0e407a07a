pub mod logger;

pub use logger::{init_logger, validate_log_level};
