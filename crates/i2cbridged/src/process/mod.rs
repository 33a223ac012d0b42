//! Process lifecycle: signal handling and the single-peer run sequence.

mod errors;
mod launch;
mod shutdown;

pub use errors::LaunchError;
#[cfg(test)]
pub(crate) use launch::run_daemon_with;
pub use launch::run_daemon;
pub use shutdown::{ShutdownError, ShutdownFlag};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
