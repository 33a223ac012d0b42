//! Test double for [`HealthReporter`] that records structured events for assertions.

use std::sync::Mutex;

use i2cbridge_config::{Config, SocketEndpoint};

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    PeerConnected,
    PeerDisconnected(String),
    TeardownCompleted(usize),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn peer_connected(&self, _endpoint: &SocketEndpoint) {
        self.record(HealthEvent::PeerConnected);
    }

    fn peer_disconnected(&self, reason: &str) {
        self.record(HealthEvent::PeerDisconnected(reason.to_owned()));
    }

    fn teardown_completed(&self, closed_buses: usize) {
        self.record(HealthEvent::TeardownCompleted(closed_buses));
    }
}
