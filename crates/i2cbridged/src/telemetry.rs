//! Process-wide log subscriber for the bridge.
//!
//! Each component logs under its own target (`i2cbridged::bus`,
//! `i2cbridged::dispatch`, `i2cbridged::transport` and so on), so a filter
//! such as `info,i2cbridged::bus=debug` traces bus traffic alone. The
//! subscriber is installed once per process; later requests keep whatever was
//! installed first and say so through the returned [`TelemetryHandle`].

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, fmt};

use i2cbridge_config::{Config, LogFormat};

/// Tracing target for subscriber installation.
pub(crate) const TELEMETRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::telemetry");

static INSTALLED: OnceCell<LogSettings> = OnceCell::new();

/// Filter expression and rendering a subscriber runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    filter: String,
    format: LogFormat,
}

impl LogSettings {
    /// Settings requested by `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            filter: config.log_filter().to_owned(),
            format: config.log_format(),
        }
    }

    /// Filter expression, in `EnvFilter` syntax.
    #[must_use]
    pub fn filter(&self) -> &str {
        self.filter.as_str()
    }

    /// Record rendering.
    #[must_use]
    pub fn format(&self) -> LogFormat {
        self.format
    }

    fn env_filter(&self) -> Result<EnvFilter, TelemetryError> {
        EnvFilter::try_new(self.filter.as_str()).map_err(|error| TelemetryError::Filter {
            filter: self.filter.clone(),
            message: error.to_string(),
        })
    }
}

/// Outcome of [`initialise`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryHandle {
    active: LogSettings,
    installed_here: bool,
}

impl TelemetryHandle {
    /// Settings of the subscriber that is actually running.
    #[must_use]
    pub fn active(&self) -> &LogSettings {
        &self.active
    }

    /// Whether this call installed the subscriber.
    #[must_use]
    pub fn installed_here(&self) -> bool {
        self.installed_here
    }

    /// Whether an earlier installation shadows different `requested`
    /// settings.
    #[must_use]
    pub fn shadows(&self, requested: &LogSettings) -> bool {
        !self.installed_here && self.active != *requested
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter is not a valid `EnvFilter` expression.
    #[error("invalid log filter `{filter}`: {message}")]
    Filter {
        /// Expression as configured.
        filter: String,
        /// Parser diagnostic.
        message: String,
    },
    /// Another global subscriber was installed outside this module.
    #[error("failed to install log subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

/// Installs the stderr subscriber described by `config`, once per process.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when the filter does not parse and
/// [`TelemetryError::Subscriber`] when a foreign subscriber is already
/// registered.
///
/// # Examples
///
/// ```rust
/// use i2cbridge_config::Config;
/// use i2cbridged::telemetry;
///
/// # fn main() -> Result<(), i2cbridged::TelemetryError> {
/// let config = Config::default();
/// let first = telemetry::initialise(&config)?;
/// let again = telemetry::initialise(&config)?;
/// assert!(!again.installed_here());
/// assert_eq!(first.active(), again.active());
/// # Ok(())
/// # }
/// ```
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    let requested = LogSettings::from_config(config);
    let mut installed_here = false;
    let active = INSTALLED.get_or_try_init(|| {
        install(&requested)?;
        installed_here = true;
        Ok::<_, TelemetryError>(requested.clone())
    })?;
    if installed_here {
        info!(
            target: TELEMETRY_TARGET,
            filter = active.filter(),
            format = %active.format(),
            "log subscriber installed"
        );
    }
    Ok(TelemetryHandle {
        active: active.clone(),
        installed_here,
    })
}

fn install(settings: &LogSettings) -> Result<(), TelemetryError> {
    let filter = settings.env_filter()?;
    let layer = match settings.format() {
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(io::stderr)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .boxed(),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()?;
    Ok(())
}
