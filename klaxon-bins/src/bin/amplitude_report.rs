//! Klaxon amplitude report
//!
//! One-shot: fetches a window per instrument, logs summary statistics, the
//! amplitude distribution and the top-N bars, and optionally exports each
//! report as a timestamped JSON file.

use anyhow::{bail, Result};
use clap::Parser;
use klaxon_bins::common::{init_logging, load_config, CommonArgs};
use klaxon_core::analysis::{write_snapshot, AmplitudeReport};
use klaxon_core::core::{Instrument, Interval};
use klaxon_core::data::{BinanceFetcher, SeriesFetcher};
use klaxon_core::metrics::AmplitudeMode;
use klaxon_core::resilience::install_panic_handler;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Amplitude statistics over recent K-lines")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Symbols to analyze (default: every configured instrument)
    #[arg(short, long)]
    symbol: Vec<String>,

    /// Interval for --symbol entries
    #[arg(short, long, default_value = "1h")]
    interval: Interval,

    /// Bars per window (overrides the config file)
    #[arg(short, long)]
    bars: Option<usize>,

    /// range, down_only or open_range (overrides the config file)
    #[arg(short, long)]
    mode: Option<AmplitudeMode>,

    /// Bars listed in the ranking (overrides the config file)
    #[arg(short, long)]
    top: Option<usize>,

    /// Export directory (overrides the config file)
    #[arg(short, long)]
    export_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let runtime = load_config(&cli.common)?;
    init_logging(&cli.common, &runtime)?;
    install_panic_handler();

    let mut analysis = runtime.analysis.clone();
    if let Some(bars) = cli.bars {
        analysis.bar_count = bars;
    }
    if let Some(mode) = cli.mode {
        analysis.amplitude_mode = mode;
    }
    if let Some(top) = cli.top {
        analysis.top_n = top;
    }
    if cli.export_dir.is_some() {
        analysis.export_dir = cli.export_dir.clone();
    }

    let instruments: Vec<Instrument> = if cli.symbol.is_empty() {
        runtime.instruments.clone()
    } else {
        cli.symbol
            .iter()
            .map(|symbol| Instrument::new(symbol, cli.interval))
            .collect()
    };

    info!("=== Klaxon: amplitude report ===");
    info!(
        "Bars: {}, mode: {}, top: {}",
        analysis.bar_count, analysis.amplitude_mode, analysis.top_n
    );

    let fetcher = BinanceFetcher::new(runtime.fetcher.clone())?;
    let mut failures = 0;

    for instrument in &instruments {
        let window = match fetcher.fetch(instrument, analysis.bar_count).await {
            Ok(window) => window,
            Err(e) => {
                error!(symbol = %instrument.symbol, error = %e, "Fetch failed");
                failures += 1;
                continue;
            }
        };

        let report = AmplitudeReport::from_window(&window, analysis.amplitude_mode, &analysis.bucket_edges);
        log_report(&report, analysis.top_n);

        if let Some(dir) = &analysis.export_dir {
            let prefix = format!(
                "{}_{}_{}_amplitude",
                report.symbol, report.interval, report.mode
            );
            if let Err(e) = write_snapshot(dir, &prefix, &report) {
                error!(symbol = %report.symbol, "Export failed: {:#}", e);
                failures += 1;
            }
        }
    }

    if failures > 0 && failures >= instruments.len() {
        bail!("No instrument could be analyzed");
    }
    Ok(())
}

fn log_report(report: &AmplitudeReport, top_n: usize) {
    info!(
        "--- {} {} ({}) : {} bars, {} measured ---",
        report.symbol,
        report.interval,
        report.mode,
        report.bars.len(),
        report.measured
    );

    let Some(summary) = &report.summary else {
        info!("No bars with a defined amplitude");
        return;
    };

    info!(
        "mean {}% | median {}% | max {}% | min {}% | stdev {}% | range {}%",
        summary.mean.round_dp(4),
        summary.median.round_dp(4),
        summary.max.round_dp(4),
        summary.min.round_dp(4),
        summary.stdev.round_dp(4),
        summary.range.round_dp(4)
    );

    for bucket in &report.distribution.buckets {
        info!(
            "  {:>8}: {:>4} bars ({}%)",
            bucket.label,
            bucket.count,
            bucket.percentage.round_dp(1)
        );
    }

    if let (Some(volatility), Some(stable)) = (report.volatility, report.stable) {
        info!(
            "volatility: {} | {}",
            volatility,
            if stable { "stable" } else { "unstable" }
        );
    }

    for (rank, bar) in report.top_by_amplitude(top_n).iter().enumerate() {
        info!(
            "  #{:<3} bar {:>4} open_time {} o={} h={} l={} c={} amplitude {}%",
            rank + 1,
            bar.index,
            bar.open_time,
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.amplitude.unwrap_or_default().round_dp(4)
        );
    }
}
