//! Structured health reporting for bridge lifecycle events.

use std::sync::Arc;

use i2cbridge_config::{Config, SocketEndpoint};

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the peer has connected.
    fn peer_connected(&self, endpoint: &SocketEndpoint);

    /// Invoked when the peer session ends. `reason` is a
    /// [`crate::dispatch::SessionEnd`] label or the transport error that
    /// ended the session.
    fn peer_disconnected(&self, reason: &str);

    /// Invoked after every bus has been released.
    fn teardown_completed(&self, closed_buses: usize);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn peer_connected(&self, endpoint: &SocketEndpoint) {
        (**self).peer_connected(endpoint);
    }

    fn peer_disconnected(&self, reason: &str) {
        (**self).peer_disconnected(reason);
    }

    fn teardown_completed(&self, closed_buses: usize) {
        (**self).teardown_completed(closed_buses);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting bridge bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            socket = %config.listen_socket(),
            device_template = %config.device_template(),
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "bridge bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "bridge bootstrap failed"
        );
    }

    fn peer_connected(&self, endpoint: &SocketEndpoint) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "peer_connected",
            socket = %endpoint,
            "peer connected"
        );
    }

    fn peer_disconnected(&self, reason: &str) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "peer_disconnected",
            reason,
            "peer session ended"
        );
    }

    fn teardown_completed(&self, closed_buses: usize) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "teardown_completed",
            closed_buses,
            "all buses released"
        );
    }
}
