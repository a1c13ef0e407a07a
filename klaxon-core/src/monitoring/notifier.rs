//! Alert delivery
//!
//! `Notifier` is the seam between the monitor loop and the outside world.
//! `AlertDispatcher` fans an alert out to every configured output:
//! - Console: tracing at a level matching the severity
//! - File: one JSON object per line, append mode
//! - Telegram: bot API `sendMessage`
//!
//! Every output is attempted even if an earlier one fails; the failures are
//! collected into one `NotifyError`. Nothing is retried, rate limited or
//! deduplicated here.

use super::alerts::{Alert, AlertSeverity};
use crate::core::NotifyError;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Destination for fired alerts
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifyError>;
}

#[async_trait]
impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifyError> {
        (**self).notify(alert).await
    }
}

#[async_trait]
impl<N: Notifier + ?Sized> Notifier for Box<N> {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifyError> {
        (**self).notify(alert).await
    }
}

/// Alert output channel configuration
#[derive(Debug, Clone)]
pub enum AlertOutput {
    /// Log through tracing
    Console { min_severity: AlertSeverity },
    /// Append JSON lines to a file
    File {
        path: PathBuf,
        min_severity: AlertSeverity,
    },
    /// Post to a Telegram chat
    Telegram {
        bot_token: String,
        chat_id: String,
        min_severity: AlertSeverity,
        /// Overridable for tests; defaults to `TELEGRAM_API_BASE`
        api_base: String,
    },
}

impl AlertOutput {
    pub fn min_severity(&self) -> AlertSeverity {
        match self {
            AlertOutput::Console { min_severity }
            | AlertOutput::File { min_severity, .. }
            | AlertOutput::Telegram { min_severity, .. } => *min_severity,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AlertOutput::Console { .. } => "console",
            AlertOutput::File { .. } => "file",
            AlertOutput::Telegram { .. } => "telegram",
        }
    }

    pub fn telegram(bot_token: impl Into<String>, chat_id: impl Into<String>, min_severity: AlertSeverity) -> Self {
        AlertOutput::Telegram {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            min_severity,
            api_base: TELEGRAM_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlertDispatcherConfig {
    pub outputs: Vec<AlertOutput>,
    /// Timeout for Telegram requests
    pub request_timeout: Duration,
}

impl Default for AlertDispatcherConfig {
    fn default() -> Self {
        Self {
            outputs: vec![AlertOutput::Console {
                min_severity: AlertSeverity::Info,
            }],
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Serialize)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Fans alerts out to every configured output
pub struct AlertDispatcher {
    config: AlertDispatcherConfig,
    client: reqwest::Client,
    /// Alerts delivered to at least one output, by severity
    counts: RwLock<HashMap<AlertSeverity, u64>>,
}

impl AlertDispatcher {
    pub fn new(config: AlertDispatcherConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        info!(
            "AlertDispatcher initialized with {} outputs: {}",
            config.outputs.len(),
            config
                .outputs
                .iter()
                .map(|o| o.kind())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            config,
            client,
            counts: RwLock::new(HashMap::new()),
        })
    }

    pub fn outputs(&self) -> &[AlertOutput] {
        &self.config.outputs
    }

    pub fn counts_by_severity(&self) -> HashMap<AlertSeverity, u64> {
        self.counts.read().clone()
    }

    /// Returns `Ok(false)` when the output filtered the alert out
    async fn send_to_output(&self, alert: &Alert, output: &AlertOutput) -> Result<bool, NotifyError> {
        if alert.severity < output.min_severity() {
            return Ok(false);
        }

        match output {
            AlertOutput::Console { .. } => send_to_console(alert),
            AlertOutput::File { path, .. } => send_to_file(alert, path).await?,
            AlertOutput::Telegram {
                bot_token,
                chat_id,
                api_base,
                ..
            } => self.send_to_telegram(alert, api_base, bot_token, chat_id).await?,
        }

        Ok(true)
    }

    async fn send_to_telegram(
        &self,
        alert: &Alert,
        api_base: &str,
        bot_token: &str,
        chat_id: &str,
    ) -> Result<(), NotifyError> {
        // The URL carries the bot token; keep it out of error text
        let url = format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), bot_token);
        let text = alert.format();

        let response = self
            .client
            .post(&url)
            .json(&TelegramMessage {
                chat_id,
                text: &text,
            })
            .send()
            .await
            .map_err(|e| NotifyError::Telegram(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::TelegramRejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for AlertDispatcher {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifyError> {
        let mut failures = Vec::new();
        let mut delivered = 0;

        for output in &self.config.outputs {
            match self.send_to_output(alert, output).await {
                Ok(true) => delivered += 1,
                Ok(false) => {}
                Err(e) => {
                    error!(output = output.kind(), alert = %alert.id(), "Failed to send alert: {}", e);
                    failures.push(e);
                }
            }
        }

        if delivered > 0 {
            *self.counts.write().entry(alert.severity).or_insert(0) += 1;
        }

        let total = self.config.outputs.len();
        match failures.len() {
            0 => Ok(()),
            1 if total == 1 => Err(failures.remove(0)),
            failed => Err(NotifyError::Partial {
                failed,
                total,
                first: failures[0].to_string(),
            }),
        }
    }
}

fn send_to_console(alert: &Alert) {
    let formatted = alert.format();

    match alert.severity {
        AlertSeverity::Info => info!("{}", formatted),
        AlertSeverity::Warning => warn!("{}", formatted),
        AlertSeverity::Error | AlertSeverity::Critical => error!("{}", formatted),
    }
}

async fn send_to_file(alert: &Alert, path: &Path) -> Result<(), NotifyError> {
    let file_error = |source| NotifyError::File {
        path: path.display().to_string(),
        source,
    };

    let mut line = alert.to_json()?;
    line.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(file_error)?;

    file.write_all(line.as_bytes()).await.map_err(file_error)?;
    file.flush().await.map_err(file_error)?;

    Ok(())
}
