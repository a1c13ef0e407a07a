//! The polling monitor loop
//!
//! One cycle walks every instrument in order:
//!
//! ```text
//! fetch bars -> (fetch funding) -> MetricSnapshot -> RuleSet -> Notifier
//!      \__ pause between instruments __/
//! ```
//!
//! then sleeps for the poll interval. Failures are isolated per instrument:
//! a `FetchError` or `ComputationError` is logged and the instrument is
//! skipped until the next cycle, and a notifier failure is logged without
//! retry. The loop only stops when the kill switch requests shutdown (or a
//! configured cycle limit is reached).

use crate::core::{ComputationError, FetchError, Instrument, MonitorError};
use crate::data::SeriesFetcher;
use crate::metrics::{AmplitudeMode, MetricSnapshot};
use crate::monitoring::{Alert, Notifier, RuleSet};
use crate::resilience::KillSwitch;
use chrono::Utc;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Timing and sampling parameters for the loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    /// Sleep after each full cycle
    pub poll_interval: Duration,
    /// Pause between consecutive instruments within a cycle
    pub instrument_pause: Duration,
    /// Bars requested per instrument
    pub bar_count: usize,
    pub amplitude_mode: AmplitudeMode,
    /// Stop after this many completed cycles; `None` runs until shutdown
    pub max_cycles: Option<u64>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            instrument_pause: Duration::from_secs(1),
            bar_count: 20,
            amplitude_mode: AmplitudeMode::Range,
            max_cycles: None,
        }
    }
}

/// Outcome of one pass over the instrument list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// 1-based cycle number
    pub cycle: u64,
    pub instruments_attempted: usize,
    pub instruments_evaluated: usize,
    pub fetch_failures: usize,
    pub computation_failures: usize,
    pub alerts_fired: usize,
    pub alerts_dispatched: usize,
    pub notify_failures: usize,
    /// Shutdown was requested before every instrument was processed
    pub interrupted: bool,
}

/// Cumulative counters across cycles
///
/// Never read by rule evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonitorStats {
    /// Cycles that visited every instrument; an interrupted cycle is not counted
    pub cycles: u64,
    /// Cycles skipped while paused
    pub skipped_cycles: u64,
    pub instruments_evaluated: u64,
    pub fetch_failures: u64,
    pub computation_failures: u64,
    pub alerts_fired: u64,
    pub alerts_dispatched: u64,
    pub notify_failures: u64,
}

impl MonitorStats {
    fn record(&mut self, report: &CycleReport) {
        if !report.interrupted {
            self.cycles += 1;
        }
        self.instruments_evaluated += report.instruments_evaluated as u64;
        self.fetch_failures += report.fetch_failures as u64;
        self.computation_failures += report.computation_failures as u64;
        self.alerts_fired += report.alerts_fired as u64;
        self.alerts_dispatched += report.alerts_dispatched as u64;
        self.notify_failures += report.notify_failures as u64;
    }
}

/// Polling monitor over a fixed instrument list
pub struct MonitorLoop<F, N> {
    fetcher: F,
    notifier: N,
    rules: RuleSet,
    instruments: Vec<Instrument>,
    settings: MonitorSettings,
    kill_switch: KillSwitch,
    stats: MonitorStats,
}

impl<F: SeriesFetcher, N: Notifier> MonitorLoop<F, N> {
    pub fn new(
        fetcher: F,
        notifier: N,
        rules: RuleSet,
        instruments: Vec<Instrument>,
        settings: MonitorSettings,
        kill_switch: KillSwitch,
    ) -> Self {
        Self {
            fetcher,
            notifier,
            rules,
            instruments,
            settings,
            kill_switch,
            stats: MonitorStats::default(),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn stats(&self) -> MonitorStats {
        self.stats
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    /// Run cycles until shutdown (or `max_cycles`)
    pub async fn run(&mut self) -> MonitorStats {
        info!(
            instruments = self.instruments.len(),
            rules = ?self.rules.rule_names(),
            poll_secs = self.settings.poll_interval.as_secs(),
            bar_count = self.settings.bar_count,
            "Starting monitor loop"
        );

        loop {
            if self.kill_switch.should_stop() {
                break;
            }

            if self.kill_switch.is_paused() {
                debug!("Monitor paused, skipping cycle");
                self.stats.skipped_cycles += 1;
            } else {
                let report = self.run_cycle().await;
                if report.interrupted {
                    break;
                }
                if let Some(max) = self.settings.max_cycles {
                    if self.stats.cycles >= max {
                        info!("Reached max cycles ({})", max);
                        break;
                    }
                }
            }

            if !self.kill_switch.sleep(self.settings.poll_interval).await {
                break;
            }
        }

        if let Some(reason) = self.kill_switch.shutdown_reason() {
            info!("Monitor stopping: {}", reason);
        }
        info!("Monitor stopped. Stats: {:?}", self.stats);

        self.stats
    }

    /// One pass over every instrument
    pub async fn run_cycle(&mut self) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport {
            cycle: self.stats.cycles + 1,
            ..CycleReport::default()
        };

        for (index, instrument) in self.instruments.iter().enumerate() {
            if index > 0 && !self.kill_switch.sleep(self.settings.instrument_pause).await {
                report.interrupted = true;
                break;
            }
            if self.kill_switch.should_stop() {
                report.interrupted = true;
                break;
            }

            report.instruments_attempted += 1;

            match self.evaluate_instrument(instrument).await {
                Ok(Some(alerts)) => {
                    report.instruments_evaluated += 1;
                    report.alerts_fired += alerts.len();
                    for alert in &alerts {
                        if self.dispatch(alert).await {
                            report.alerts_dispatched += 1;
                        } else {
                            report.notify_failures += 1;
                        }
                    }
                }
                Ok(None) => {
                    report.interrupted = true;
                    break;
                }
                Err(MonitorError::Fetch(e)) => {
                    report.fetch_failures += 1;
                    log_fetch_failure(instrument, &e);
                }
                Err(MonitorError::Computation { symbol, source }) => {
                    report.computation_failures += 1;
                    log_computation_failure(instrument, &symbol, &source);
                }
            }
        }

        self.stats.record(&report);

        info!(
            cycle = report.cycle,
            attempted = report.instruments_attempted,
            evaluated = report.instruments_evaluated,
            fetch_failures = report.fetch_failures,
            computation_failures = report.computation_failures,
            alerts = report.alerts_dispatched,
            notify_failures = report.notify_failures,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Cycle complete"
        );

        report
    }

    /// Fetch, compute and evaluate rules for one instrument
    ///
    /// `Ok(None)` means shutdown interrupted the fetch.
    async fn evaluate_instrument(
        &self,
        instrument: &Instrument,
    ) -> Result<Option<Vec<Alert>>, MonitorError> {
        let fetched = self
            .kill_switch
            .run_until_stopped(self.fetcher.fetch(instrument, self.settings.bar_count))
            .await;
        let window = match fetched {
            Some(window) => window?,
            None => return Ok(None),
        };

        let funding_rate = if instrument.funding && self.rules.needs_funding() {
            match self
                .kill_switch
                .run_until_stopped(self.fetcher.fetch_funding_rate(instrument))
                .await
            {
                Some(Ok(rate)) => Some(rate),
                Some(Err(e)) => {
                    warn!(
                        symbol = %instrument.symbol,
                        interval = %instrument.interval,
                        error = %e,
                        "Funding rate unavailable, evaluating without it"
                    );
                    None
                }
                None => return Ok(None),
            }
        } else {
            None
        };

        let snapshot = MetricSnapshot::from_window(
            &window,
            self.settings.amplitude_mode,
            funding_rate,
            Utc::now(),
        )
        .map_err(|source| MonitorError::Computation {
            symbol: instrument.symbol.clone(),
            source,
        })?;

        debug!(
            symbol = %instrument.symbol,
            interval = %instrument.interval,
            bars = window.len(),
            close = %snapshot.last_close,
            percent_change = %snapshot.percent_change.round_dp(4),
            volume_ratio = %snapshot.volume_ratio.round_dp(4),
            amplitude = ?snapshot.amplitude.map(|a| a.round_dp(4)),
            funding_rate = ?snapshot.funding_rate,
            "Evaluated instrument"
        );

        Ok(Some(self.rules.evaluate(&snapshot)))
    }

    async fn dispatch(&self, alert: &Alert) -> bool {
        match self.notifier.notify(alert).await {
            Ok(()) => {
                info!(symbol = %alert.symbol, rule = %alert.rule, "Alert dispatched");
                true
            }
            Err(e) => {
                error!(
                    symbol = %alert.symbol,
                    rule = %alert.rule,
                    error = %e,
                    "Failed to dispatch alert"
                );
                false
            }
        }
    }
}

fn log_fetch_failure(instrument: &Instrument, error: &FetchError) {
    warn!(
        symbol = %error.symbol(),
        interval = %instrument.interval,
        error = %error,
        "Fetch failed, skipping instrument this cycle"
    );
}

fn log_computation_failure(instrument: &Instrument, symbol: &str, error: &ComputationError) {
    warn!(
        symbol = %symbol,
        interval = %instrument.interval,
        error = %error,
        "Metric computation failed, skipping instrument this cycle"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Interval;
    use crate::monitoring::AlertThresholds;
    use crate::testing::{bars_with_volumes, spike_volumes, RecordingNotifier, ScriptedFetcher};
    use rust_decimal_macros::dec;

    fn settings() -> MonitorSettings {
        MonitorSettings {
            max_cycles: Some(1),
            ..MonitorSettings::default()
        }
    }

    fn instrument(symbol: &str) -> Instrument {
        Instrument::new(symbol, Interval::Minute5)
    }

    fn monitor(
        fetcher: ScriptedFetcher,
        notifier: RecordingNotifier,
        instruments: Vec<Instrument>,
    ) -> MonitorLoop<ScriptedFetcher, RecordingNotifier> {
        MonitorLoop::new(
            fetcher,
            notifier,
            RuleSet::from_config(&AlertThresholds::default()),
            instruments,
            settings(),
            KillSwitch::new(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_cycle_dispatches_nothing() {
        let fetcher = ScriptedFetcher::new().with_bars("BTCUSDT", bars_with_volumes(&[dec!(10); 20]));
        let notifier = RecordingNotifier::new();
        let mut monitor = monitor(fetcher, notifier.clone(), vec![instrument("BTCUSDT")]);

        let report = monitor.run_cycle().await;

        assert_eq!(report.cycle, 1);
        assert_eq!(report.instruments_evaluated, 1);
        assert_eq!(report.alerts_fired, 0);
        assert!(notifier.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_computation_failure_is_isolated() {
        let zero_open = vec![crate::testing::BarBuilder::at(0)
            .ohlc(dec!(0), dec!(1), dec!(0), dec!(1))
            .build()];
        let fetcher = ScriptedFetcher::new()
            .with_bars("BADUSDT", zero_open)
            .with_bars("ETHUSDT", bars_with_volumes(&spike_volumes(20, dec!(10), dec!(30))));
        let notifier = RecordingNotifier::new();
        let mut monitor = monitor(
            fetcher,
            notifier.clone(),
            vec![instrument("BADUSDT"), instrument("ETHUSDT")],
        );

        let report = monitor.run_cycle().await;

        assert_eq!(report.computation_failures, 1);
        assert_eq!(report.instruments_evaluated, 1);
        assert_eq!(notifier.symbols(), vec!["ETHUSDT"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notify_failure_is_counted_not_retried() {
        let fetcher = ScriptedFetcher::new()
            .with_bars("ETHUSDT", bars_with_volumes(&spike_volumes(20, dec!(10), dec!(30))));
        let notifier = RecordingNotifier::failing();
        let mut monitor = monitor(fetcher, notifier.clone(), vec![instrument("ETHUSDT")]);

        let report = monitor.run_cycle().await;

        assert_eq!(report.alerts_fired, 1);
        assert_eq!(report.notify_failures, 1);
        assert_eq!(report.alerts_dispatched, 0);
        assert_eq!(notifier.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_funding_failure_keeps_other_rules() {
        let perp = instrument("BTCUSDT").with_funding(true);
        let fetcher = ScriptedFetcher::new()
            .with_bars("BTCUSDT", bars_with_volumes(&spike_volumes(20, dec!(10), dec!(30))))
            .with_funding_failure("BTCUSDT", 503);
        let notifier = RecordingNotifier::new();
        let mut monitor = monitor(fetcher, notifier.clone(), vec![perp]);

        let report = monitor.run_cycle().await;

        assert_eq!(report.instruments_evaluated, 1);
        assert_eq!(monitor.fetcher().funding_count("BTCUSDT"), 1);
        let rules: Vec<String> = notifier.alerts().into_iter().map(|a| a.rule).collect();
        assert_eq!(rules, vec!["volume_spike"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_funding_rule_fires_for_perpetual() {
        let perp = instrument("BTCUSDT").with_funding(true);
        let fetcher = ScriptedFetcher::new()
            .with_bars("BTCUSDT", bars_with_volumes(&[dec!(10); 20]))
            .with_funding("BTCUSDT", dec!(0.25));
        let notifier = RecordingNotifier::new();
        let mut monitor = monitor(fetcher, notifier.clone(), vec![perp, instrument("ETHUSDT")]);

        monitor.run_cycle().await;

        let alerts = notifier.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].rule, "funding_rate");
        assert_eq!(monitor.fetcher().funding_count("ETHUSDT"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paused_switch_skips_fetching() {
        let fetcher = ScriptedFetcher::new().with_bars("BTCUSDT", bars_with_volumes(&[dec!(10); 5]));
        let kill_switch = KillSwitch::new();
        kill_switch.pause();
        let mut monitor = MonitorLoop::new(
            fetcher,
            RecordingNotifier::new(),
            RuleSet::from_config(&AlertThresholds::default()),
            vec![instrument("BTCUSDT")],
            MonitorSettings::default(),
            kill_switch.clone(),
        );

        let stopper = kill_switch.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(150)).await;
            stopper.shutdown("test done");
        });

        let stats = monitor.run().await;

        assert_eq!(stats.cycles, 0);
        assert_eq!(stats.skipped_cycles, 3);
        assert_eq!(monitor.fetcher().total_fetches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupted_cycle_is_not_completed() {
        let fetcher = ScriptedFetcher::new()
            .with_bars("BTCUSDT", bars_with_volumes(&[dec!(10); 20]))
            .with_bars("ETHUSDT", bars_with_volumes(&[dec!(10); 20]));
        let kill_switch = KillSwitch::new();
        let mut monitor = MonitorLoop::new(
            fetcher,
            RecordingNotifier::new(),
            RuleSet::from_config(&AlertThresholds::default()),
            vec![instrument("BTCUSDT"), instrument("ETHUSDT")],
            MonitorSettings::default(),
            kill_switch.clone(),
        );

        // Lands inside the one-second pause between the two instruments
        let stopper = kill_switch.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            stopper.shutdown("mid-cycle stop");
        });

        let stats = monitor.run().await;

        assert_eq!(stats.cycles, 0);
        assert_eq!(stats.instruments_evaluated, 1);
        assert_eq!(monitor.fetcher().total_fetches(), 1);
    }
}
