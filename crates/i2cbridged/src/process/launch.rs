//! Runs the bridge: bootstrap, wait for the peer, serve it, tear down.

use std::sync::Arc;

use tracing::{info, warn};

use crate::StructuredHealthReporter;
use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::bus::{BusProvider, LinuxI2cProvider};
use crate::health::HealthReporter;
use crate::transport::SocketListener;

use super::errors::LaunchError;
use super::shutdown::ShutdownFlag;
use super::PROCESS_TARGET;

/// Runs the bridge using the production collaborators.
///
/// # Errors
///
/// Returns a [`LaunchError`] when the bridge cannot start. Once a peer has
/// connected, the session always ends with an orderly teardown and `Ok`.
pub fn run_daemon() -> Result<(), LaunchError> {
    let shutdown = ShutdownFlag::install()?;
    let reporter = Arc::new(StructuredHealthReporter::new());
    run_daemon_with(&SystemConfigLoader, reporter, LinuxI2cProvider::new(), shutdown)
}

/// Runs the bridge with injected collaborators.
pub(crate) fn run_daemon_with<P>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    provider: P,
    shutdown: ShutdownFlag,
) -> Result<(), LaunchError>
where
    P: BusProvider + Clone,
{
    let daemon = bootstrap_with(loader, reporter, provider)?;
    let listener = SocketListener::bind(daemon.config().listen_socket())?;

    let Some(mut stream) = listener.accept_peer(&shutdown)? else {
        info!(target: PROCESS_TARGET, "shutdown requested before a peer connected");
        return Ok(());
    };
    daemon.reporter().peer_connected(listener.endpoint());

    let mut connection = daemon.connection(shutdown);
    let reason = match connection.serve(&mut stream) {
        Ok(end) => end.to_string(),
        Err(error) => {
            warn!(target: PROCESS_TARGET, %error, "peer session failed");
            error.to_string()
        }
    };
    drop(stream);
    daemon.reporter().peer_disconnected(&reason);

    let closed = connection.teardown();
    daemon.reporter().teardown_completed(closed);
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}
