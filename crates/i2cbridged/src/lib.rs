//! Bridge between a remote controller and the host's I2C buses.
//!
//! The bridge accepts a single peer over the socket configured via
//! [`i2cbridge_config`], then serves its requests one at a time: opening and
//! closing buses, selecting peripherals, and moving register blocks of up to
//! [`bus::MAX_BLOCK_LEN`] bytes. Each connection owns a [`dispatch::BusSession`]
//! holding the open buses and the current bus, address and register, so a
//! peer may omit leading addressing fields once it has established them.
//!
//! Startup follows the usual sequence: configuration is loaded, structured
//! telemetry is initialised, the socket filesystem is prepared, and lifecycle
//! events are surfaced through a [`HealthReporter`]. When the session ends,
//! for whatever reason, every open bus is released before the process exits.

mod bootstrap;
pub mod bus;
pub mod dispatch;
mod health;
mod process;
pub mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, ShutdownError, ShutdownFlag, run_daemon};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{ConnectionStream, ListenerError, TransportError};

#[cfg(test)]
mod tests;
