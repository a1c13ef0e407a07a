//! Kill switch: shared shutdown and pause coordination
//!
//! The monitor loop checks the switch before every cycle and races it
//! against each suspension point (fetch, pause, cycle sleep), so a shutdown
//! request takes effect without waiting for the current sleep to finish.
//!
//! ## Usage
//!
//! ```no_run
//! use klaxon_core::resilience::KillSwitch;
//!
//! # async fn run() {
//! let kill_switch = KillSwitch::new();
//! let handle = kill_switch.clone();
//! std::thread::spawn(move || handle.shutdown("operator request"));
//!
//! while kill_switch.sleep(std::time::Duration::from_secs(60)).await {
//!     // one cycle
//! }
//! # }
//! ```
//!
//! Pausing makes the loop skip cycles (no fetches) until resumed.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::info;

/// Kill switch state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KillSwitchState {
    Running = 0,
    /// Skipping cycles; can resume
    Paused = 1,
    /// Terminal
    ShuttingDown = 2,
}

impl From<u8> for KillSwitchState {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Paused,
            2 => Self::ShuttingDown,
            _ => Self::Running,
        }
    }
}

/// Cloneable shutdown/pause token; clones share state
#[derive(Clone)]
pub struct KillSwitch {
    state: Arc<AtomicU8>,
    /// Woken on every state transition
    changed: Arc<Notify>,
    shutdown_reason: Arc<Mutex<Option<String>>>,
    shutdown_time: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl KillSwitch {
    /// Create a new kill switch in Running state
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(KillSwitchState::Running as u8)),
            changed: Arc::new(Notify::new()),
            shutdown_reason: Arc::new(Mutex::new(None)),
            shutdown_time: Arc::new(Mutex::new(None)),
        }
    }

    #[inline]
    pub fn should_stop(&self) -> bool {
        self.state() == KillSwitchState::ShuttingDown
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.state() == KillSwitchState::Paused
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state() == KillSwitchState::Running
    }

    pub fn state(&self) -> KillSwitchState {
        self.state.load(Ordering::Acquire).into()
    }

    /// Request shutdown; idempotent, the first reason wins
    ///
    /// The reason and time are stored before the state flips, so anyone who
    /// observes `should_stop()` can also read them.
    pub fn shutdown(&self, reason: &str) {
        {
            let mut stored = self.shutdown_reason.lock();
            if stored.is_none() {
                info!("Kill switch activated: {}", reason);
                *self.shutdown_time.lock() = Some(Utc::now());
                *stored = Some(reason.to_string());
            }
        }

        self.state.store(KillSwitchState::ShuttingDown as u8, Ordering::Release);
        self.changed.notify_waiters();
    }

    /// Pause monitoring (only from Running)
    pub fn pause(&self) {
        if self.transition(KillSwitchState::Running, KillSwitchState::Paused) {
            info!("Kill switch: pausing monitor");
        }
    }

    /// Resume monitoring (only from Paused)
    pub fn resume(&self) {
        if self.transition(KillSwitchState::Paused, KillSwitchState::Running) {
            info!("Kill switch: resuming monitor");
        }
    }

    pub fn toggle_pause(&self) {
        if self.is_paused() {
            self.resume();
        } else if self.is_running() {
            self.pause();
        }
    }

    pub fn shutdown_reason(&self) -> Option<String> {
        self.shutdown_reason.lock().clone()
    }

    pub fn shutdown_time(&self) -> Option<DateTime<Utc>> {
        *self.shutdown_time.lock()
    }

    /// Resolves once shutdown has been requested
    pub async fn stopped(&self) {
        self.wait_until(|ks| ks.should_stop()).await
    }

    /// Resolves once the switch is no longer paused
    pub async fn unpaused(&self) {
        self.wait_until(|ks| !ks.is_paused()).await
    }

    /// Sleep for `duration` unless shutdown is requested first
    ///
    /// Returns `false` if the sleep was cut short by shutdown.
    pub async fn sleep(&self, duration: Duration) -> bool {
        self.run_until_stopped(tokio::time::sleep(duration))
            .await
            .is_some()
    }

    /// Drive `future` to completion unless shutdown is requested first
    pub async fn run_until_stopped<F: Future>(&self, future: F) -> Option<F::Output> {
        if self.should_stop() {
            return None;
        }

        tokio::select! {
            biased;
            _ = self.stopped() => None,
            output = future => Some(output),
        }
    }

    fn transition(&self, from: KillSwitchState, to: KillSwitchState) -> bool {
        let swapped = self
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if swapped {
            self.changed.notify_waiters();
        }
        swapped
    }

    async fn wait_until(&self, condition: impl Fn(&Self) -> bool) {
        loop {
            // Register before checking so a transition in between is not missed
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if condition(self) {
                return;
            }
            notified.await;
        }
    }
}

impl Default for KillSwitch {
    fn default() -> Self {
        Self::new()
    }
}
