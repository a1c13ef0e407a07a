//! Test doubles and builders for unit and integration tests
//!
//! - `ScriptedFetcher`: per-symbol canned bars, failures and funding rates
//! - `RecordingNotifier`: captures dispatched alerts
//! - `BarBuilder` and window helpers
//! - `serve_once`: canned HTTP response on a loopback port

pub mod helpers;
pub mod http_stub;
pub mod mock_fetcher;
pub mod recording_notifier;

pub use helpers::*;
pub use http_stub::serve_once;
pub use mock_fetcher::ScriptedFetcher;
pub use recording_notifier::RecordingNotifier;
