use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

const TERMINATION_SIGNALS: [i32; 4] = [SIGTERM, SIGINT, SIGQUIT, SIGHUP];

/// Errors reported while installing signal handlers.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Flag raised by termination signals and polled between blocking waits.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    requested: Arc<AtomicBool>,
}

impl ShutdownFlag {
    /// Creates a flag that only [`ShutdownFlag::request`] can raise.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a flag raised by SIGTERM, SIGINT, SIGQUIT or SIGHUP.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::Install`] if a handler cannot be registered.
    pub fn install() -> Result<Self, ShutdownError> {
        let flag = Self::new();
        for signal in TERMINATION_SIGNALS {
            signal_hook::flag::register(signal, Arc::clone(&flag.requested))
                .map_err(|source| ShutdownError::Install { source })?;
        }
        info!(target: PROCESS_TARGET, "termination signal handlers installed");
        Ok(flag)
    }

    /// Raises the flag.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}
