//! Shutdown coordination and crash logging

pub mod kill_switch;
pub mod panic;

pub use kill_switch::{KillSwitch, KillSwitchState};
pub use panic::install_panic_handler;
