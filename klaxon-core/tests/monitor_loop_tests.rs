//! Monitor loop scenarios
//!
//! Drives `MonitorLoop` end to end with a scripted fetcher and a recording
//! notifier under paused tokio time, so multi-cycle runs finish instantly.

use klaxon_core::core::{Instrument, Interval};
use klaxon_core::engine::{MonitorLoop, MonitorSettings};
use klaxon_core::monitoring::{AlertCategory, AlertThresholds, RuleSet};
use klaxon_core::resilience::KillSwitch;
use klaxon_core::testing::{bars_with_volumes, spike_volumes, BarBuilder, RecordingNotifier, ScriptedFetcher};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

fn instrument(symbol: &str) -> Instrument {
    Instrument::new(symbol, Interval::Minute5)
}

fn monitor_with(
    fetcher: ScriptedFetcher,
    notifier: RecordingNotifier,
    instruments: Vec<Instrument>,
    max_cycles: u64,
) -> MonitorLoop<ScriptedFetcher, RecordingNotifier> {
    MonitorLoop::new(
        fetcher,
        notifier,
        RuleSet::from_config(&AlertThresholds::default()),
        instruments,
        MonitorSettings {
            max_cycles: Some(max_cycles),
            ..MonitorSettings::default()
        },
        KillSwitch::new(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_failing_instrument_does_not_block_others() {
    let fetcher = ScriptedFetcher::new()
        .with_failure("AAAUSDT", 500, "internal error")
        .with_bars("BBBUSDT", bars_with_volumes(&spike_volumes(20, dec!(100), dec!(300))));
    let notifier = RecordingNotifier::new();
    let mut monitor = monitor_with(
        fetcher,
        notifier.clone(),
        vec![instrument("AAAUSDT"), instrument("BBBUSDT")],
        1,
    );

    let report = monitor.run_cycle().await;

    assert_eq!(report.instruments_attempted, 2);
    assert_eq!(report.fetch_failures, 1);
    assert_eq!(report.instruments_evaluated, 1);
    assert_eq!(report.alerts_dispatched, 1);
    assert!(!report.interrupted);

    let alerts = notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].symbol, "BBBUSDT");
    assert_eq!(alerts[0].category, AlertCategory::Volume);
    let ratio: Decimal = alerts[0].detail("volume_ratio").unwrap().parse().unwrap();
    assert_eq!(ratio, dec!(3));

    assert_eq!(monitor.fetcher().fetch_count("AAAUSDT"), 1);
    assert_eq!(monitor.fetcher().fetch_count("BBBUSDT"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_each_instrument_fetched_once_per_cycle() {
    let fetcher = ScriptedFetcher::new()
        .with_failure("AAAUSDT", 429, "rate limited")
        .with_bars("BBBUSDT", bars_with_volumes(&spike_volumes(20, dec!(100), dec!(300))));
    let notifier = RecordingNotifier::new();
    let mut monitor = monitor_with(
        fetcher,
        notifier.clone(),
        vec![instrument("AAAUSDT"), instrument("BBBUSDT")],
        3,
    );

    let stats = monitor.run().await;

    assert_eq!(stats.cycles, 3);
    assert_eq!(stats.fetch_failures, 3);
    assert_eq!(stats.instruments_evaluated, 3);
    // No debounce: the condition holds every cycle, so it fires every cycle
    assert_eq!(stats.alerts_dispatched, 3);
    assert_eq!(notifier.symbols(), vec!["BBBUSDT"; 3]);
    assert_eq!(monitor.fetcher().fetch_count("AAAUSDT"), 3);
    assert_eq!(monitor.fetcher().fetch_count("BBBUSDT"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_cycle_timing_follows_settings() {
    let fetcher = ScriptedFetcher::new()
        .with_bars("AAAUSDT", bars_with_volumes(&[dec!(10); 20]))
        .with_bars("BBBUSDT", bars_with_volumes(&[dec!(10); 20]))
        .with_bars("CCCUSDT", bars_with_volumes(&[dec!(10); 20]));
    let mut monitor = monitor_with(
        fetcher,
        RecordingNotifier::new(),
        vec![instrument("AAAUSDT"), instrument("BBBUSDT"), instrument("CCCUSDT")],
        2,
    );

    let started = tokio::time::Instant::now();
    let stats = monitor.run().await;

    // Two cycles of two 1s pauses, one 60s poll sleep between them
    assert_eq!(stats.cycles, 2);
    assert_eq!(started.elapsed(), Duration::from_secs(64));
}

#[tokio::test(start_paused = true)]
async fn test_requests_configured_bar_count() {
    let fetcher = ScriptedFetcher::new().with_bars("AAAUSDT", bars_with_volumes(&[dec!(10); 50]));
    let mut monitor = MonitorLoop::new(
        fetcher,
        RecordingNotifier::new(),
        RuleSet::from_config(&AlertThresholds::default()),
        vec![instrument("AAAUSDT")],
        MonitorSettings {
            bar_count: 30,
            max_cycles: Some(1),
            ..MonitorSettings::default()
        },
        KillSwitch::new(),
    );

    monitor.run().await;

    assert_eq!(monitor.fetcher().requested_counts(), vec![30]);
}

#[tokio::test(start_paused = true)]
async fn test_price_and_volume_rules_fire_together() {
    let mut bars = bars_with_volumes(&[dec!(10); 19]);
    bars.push(
        BarBuilder::at(19)
            .ohlc(dec!(100), dec!(106), dec!(99), dec!(105))
            .volume(dec!(50))
            .build(),
    );
    let fetcher = ScriptedFetcher::new().with_bars("ETHUSDT", bars);
    let notifier = RecordingNotifier::new();
    let mut monitor = monitor_with(fetcher, notifier.clone(), vec![instrument("ETHUSDT")], 1);

    let report = monitor.run_cycle().await;

    assert_eq!(report.alerts_fired, 2);
    let mut rules: Vec<String> = notifier.alerts().into_iter().map(|a| a.rule).collect();
    rules.sort();
    assert_eq!(rules, vec!["percent_change", "volume_spike"]);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_interrupts_poll_sleep() {
    let fetcher = ScriptedFetcher::new().with_bars("AAAUSDT", bars_with_volumes(&[dec!(10); 20]));
    let kill_switch = KillSwitch::new();
    let mut monitor = MonitorLoop::new(
        fetcher,
        RecordingNotifier::new(),
        RuleSet::from_config(&AlertThresholds::default()),
        vec![instrument("AAAUSDT")],
        MonitorSettings::default(),
        kill_switch.clone(),
    );

    let stopper = kill_switch.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(90)).await;
        stopper.shutdown("test finished");
    });

    let started = tokio::time::Instant::now();
    let stats = monitor.run().await;

    // Cycle at t=0, cycle at t=60, shutdown during the second sleep
    assert_eq!(stats.cycles, 2);
    assert_eq!(started.elapsed(), Duration::from_secs(90));
    assert_eq!(kill_switch.shutdown_reason().as_deref(), Some("test finished"));
}

#[tokio::test(start_paused = true)]
async fn test_notifier_recovery_between_cycles() {
    let fetcher = ScriptedFetcher::new()
        .with_bars("BBBUSDT", bars_with_volumes(&spike_volumes(20, dec!(100), dec!(300))));
    let notifier = RecordingNotifier::failing();
    let mut monitor = monitor_with(fetcher, notifier.clone(), vec![instrument("BBBUSDT")], 2);

    let first = monitor.run_cycle().await;
    notifier.set_failing(false);
    let second = monitor.run_cycle().await;

    assert_eq!(first.notify_failures, 1);
    assert_eq!(second.alerts_dispatched, 1);
    assert_eq!(notifier.attempts(), 2);
    assert_eq!(notifier.len(), 1);

    let stats = monitor.stats();
    assert_eq!(stats.cycles, 2);
    assert_eq!(stats.notify_failures, 1);
    assert_eq!(stats.alerts_dispatched, 1);
}
