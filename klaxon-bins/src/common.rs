//! Common utilities for all binaries
//!
//! Shared CLI arguments, configuration loading and logging setup.

use anyhow::{Context, Result};
use clap::Args;
use klaxon_core::config::{KlaxonConfig, RuntimeConfig};
use klaxon_core::engine::MonitorStats;
use std::path::PathBuf;

/// Common CLI arguments for all binaries
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config/klaxon.toml")]
    pub config: PathBuf,

    /// Log level / filter directive (overrides the config file)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Emit JSON log lines
    #[arg(long)]
    pub json_logs: bool,
}

/// Load `.env`, read the config file and validate it
pub fn load_config(args: &CommonArgs) -> Result<RuntimeConfig> {
    // A missing .env is normal; secrets may come from the real environment
    let _ = dotenvy::dotenv();

    let config = KlaxonConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", args.config.display()))
}

/// Initialize tracing from CLI overrides, falling back to the config file
pub fn init_logging(args: &CommonArgs, runtime: &RuntimeConfig) -> Result<()> {
    let level = args.log_level.as_deref().unwrap_or(&runtime.logging.level);
    klaxon_core::utils::validate_log_level(level)?;

    if !klaxon_core::utils::init_logger(level, args.json_logs || runtime.logging.json) {
        tracing::warn!("Logger already initialized");
    }
    Ok(())
}

/// Print final statistics
pub fn print_stats(stats: &MonitorStats) {
    tracing::info!("=== Final Statistics ===");
    tracing::info!("Cycles completed: {}", stats.cycles);
    tracing::info!("Cycles skipped (paused): {}", stats.skipped_cycles);
    tracing::info!("Instruments evaluated: {}", stats.instruments_evaluated);
    tracing::info!("Fetch failures: {}", stats.fetch_failures);
    tracing::info!("Computation failures: {}", stats.computation_failures);
    tracing::info!("Alerts fired: {}", stats.alerts_fired);
    tracing::info!("Alerts dispatched: {}", stats.alerts_dispatched);
    tracing::info!("Notify failures: {}", stats.notify_failures);
}
