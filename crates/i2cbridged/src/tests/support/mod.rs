//! Test harness utilities shared by unit and behavioural suites.

mod bus_provider;
mod config_loader;
mod peer;
mod reporter;

pub use bus_provider::{BusCall, FailurePoint, RecordingBusProvider};
pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use peer::ScriptedPeer;
pub use reporter::{HealthEvent, RecordingHealthReporter};
