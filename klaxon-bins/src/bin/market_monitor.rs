//! Klaxon market monitor
//!
//! Polls K-lines for every configured instrument, evaluates the alert rules
//! and dispatches alerts to the configured outputs until Ctrl+C.

use anyhow::{Context, Result};
use clap::Parser;
use klaxon_bins::common::{init_logging, load_config, print_stats, CommonArgs};
use klaxon_core::data::BinanceFetcher;
use klaxon_core::engine::MonitorLoop;
use klaxon_core::monitoring::{AlertDispatcher, RuleSet};
use klaxon_core::resilience::{install_panic_handler, KillSwitch};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Poll K-lines and fire threshold alerts")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Stop after this many cycles (overrides the config file)
    #[arg(long, conflicts_with = "once")]
    max_cycles: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut runtime = load_config(&cli.common)?;
    init_logging(&cli.common, &runtime)?;
    install_panic_handler();

    if cli.once {
        runtime.settings.max_cycles = Some(1);
    } else if let Some(max) = cli.max_cycles {
        runtime.settings.max_cycles = Some(max.max(1));
    }

    info!("=== Klaxon: market monitor ===");
    info!("Config: {}", cli.common.config.display());
    for instrument in &runtime.instruments {
        info!("  - {} (funding: {})", instrument, instrument.funding);
    }

    let kill_switch = KillSwitch::new();
    let kill_switch_ctrlc = kill_switch.clone();
    ctrlc::set_handler(move || {
        warn!("Received Ctrl+C, initiating graceful shutdown...");
        kill_switch_ctrlc.shutdown("User requested shutdown (Ctrl+C)");
    })?;

    let fetcher = BinanceFetcher::new(runtime.fetcher.clone()).context("Failed to build HTTP client")?;
    let dispatcher = AlertDispatcher::new(runtime.dispatcher.clone())
        .context("Failed to build alert dispatcher")?;
    let rules = RuleSet::from_config(&runtime.thresholds);

    let mut monitor = MonitorLoop::new(
        fetcher,
        dispatcher,
        rules,
        runtime.instruments.clone(),
        runtime.settings.clone(),
        kill_switch,
    );

    let stats = monitor.run().await;
    print_stats(&stats);

    Ok(())
}
