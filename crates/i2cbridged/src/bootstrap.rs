//! Startup of the bridge up to the point where it can accept a peer.
//!
//! Bootstrap never opens a bus. Buses are opened on request, inside the
//! session built for each peer by [`Daemon::connection`].

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;
use tracing::warn;

use i2cbridge_config::{Config, SocketEndpoint, SocketPreparationError};

use crate::bus::{BusProvider, BusRegistry};
use crate::dispatch::{BusSession, CommandDispatcher, ConnectionLoop};
use crate::health::HealthReporter;
use crate::process::ShutdownFlag;
use crate::telemetry::{self, LogSettings, TELEMETRY_TARGET, TelemetryError};

/// Source of the bridge configuration.
pub trait ConfigLoader: Send + Sync {
    /// Produces the configuration for this run.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Layers defaults, the optional file, `I2CBRIDGE_*` variables and the
/// process arguments.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Hands out a configuration resolved elsewhere, for embedders and tests.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Reasons the bridge cannot get as far as listening.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// The log subscriber could not be installed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The directory for a Unix listen socket could not be prepared.
    #[error("failed to prepare listen socket {endpoint}: {source}")]
    Socket {
        /// Endpoint being prepared.
        endpoint: SocketEndpoint,
        /// Filesystem error.
        #[source]
        source: SocketPreparationError,
    },
}

/// A bootstrapped bridge, ready to bind and serve.
pub struct Daemon<P> {
    config: Config,
    dispatcher: CommandDispatcher,
    provider: P,
    reporter: Arc<dyn HealthReporter>,
}

impl<P> Daemon<P> {
    /// Resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Reporter that observes the rest of the lifecycle.
    #[must_use]
    pub fn reporter(&self) -> &Arc<dyn HealthReporter> {
        &self.reporter
    }
}

impl<P> Daemon<P>
where
    P: BusProvider + Clone,
{
    /// Builds a connection loop for one peer. The peer starts with no open
    /// buses and a cleared addressing context.
    #[must_use]
    pub fn connection(&self, shutdown: ShutdownFlag) -> ConnectionLoop<P> {
        let registry = BusRegistry::new(
            self.provider.clone(),
            self.config.device_template().clone(),
        );
        ConnectionLoop::new(self.dispatcher.clone(), BusSession::new(registry), shutdown)
    }
}

/// Bootstraps the bridge using the supplied collaborators.
///
/// # Errors
///
/// Returns a [`BootstrapError`] when configuration, telemetry or socket
/// preparation fails. The reporter observes the failure before it is
/// returned.
pub fn bootstrap_with<P>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    provider: P,
) -> Result<Daemon<P>, BootstrapError>
where
    P: BusProvider,
{
    reporter.bootstrap_starting();
    let config = prepare(loader).inspect_err(|error| reporter.bootstrap_failed(error))?;
    reporter.bootstrap_succeeded(&config);
    Ok(Daemon {
        dispatcher: CommandDispatcher::new(config.reply_tag()),
        config,
        provider,
        reporter,
    })
}

fn prepare(loader: &dyn ConfigLoader) -> Result<Config, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;

    let requested = LogSettings::from_config(&config);
    let handle =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    if handle.shadows(&requested) {
        warn!(
            target: TELEMETRY_TARGET,
            requested_filter = requested.filter(),
            active_filter = handle.active().filter(),
            "log subscriber already installed; keeping its settings"
        );
    }

    let endpoint = config.listen_socket();
    endpoint
        .prepare_filesystem()
        .map_err(|source| BootstrapError::Socket {
            endpoint: endpoint.clone(),
            source,
        })?;
    Ok(config)
}
