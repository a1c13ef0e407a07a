//! Global panic hook
//!
//! Call `install_panic_handler()` early in `main()` (after logging is
//! initialized) so a panic anywhere in the monitor is logged through tracing
//! before the process exits.

use std::panic;
use std::process;
use tracing::error;

/// Install a panic hook that logs location and message, then exits(1)
///
/// This does not catch panics; it only makes sure they are logged.
pub fn install_panic_handler() {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_else(|| "<unknown location>".to_string());

        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "<no message>".to_string()
        };

        error!(
            location = %location,
            message = %message,
            "PANIC: monitor crashed"
        );

        // Backup in case tracing is misconfigured
        eprintln!("FATAL PANIC at {}: {}", location, message);

        default_hook(panic_info);

        // Let the subscriber flush
        std::thread::sleep(std::time::Duration::from_millis(100));
        process::exit(1);
    }));

    tracing::info!("Panic handler installed");
}
