use crate::core::ConfigError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global tracing subscriber
///
/// `RUST_LOG` overrides `log_level` when set. Returns `false` if a
/// subscriber was already installed (e.g. by a test harness).
pub fn init_logger(log_level: &str, json_logs: bool) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let result = if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true))
            .try_init()
    };

    result.is_ok()
}

/// Check that `log_level` is a valid filter directive
pub fn validate_log_level(log_level: &str) -> Result<(), ConfigError> {
    EnvFilter::try_new(log_level)
        .map(|_| ())
        .map_err(|_| ConfigError::InvalidLogLevel(log_level.to_string()))
}
