//! Listener for the single peer connection.
//!
//! The listening socket is polled rather than blocked on, so a shutdown
//! signal that arrives before the peer does still ends the process. A Unix
//! socket file left behind by an earlier run is reclaimed only when nothing
//! answers on it; the file is removed again when the listener is dropped.

use std::fs;
use std::io;
use std::net::{TcpListener, ToSocketAddrs};
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::thread;
use std::time::Duration;

use camino::Utf8Path;
use tracing::{info, warn};

use i2cbridge_config::SocketEndpoint;

use crate::process::ShutdownFlag;

use super::{ConnectionStream, LISTENER_TARGET, ListenerError};

const IDLE_POLL: Duration = Duration::from_millis(25);
const FAILURE_POLL: Duration = Duration::from_millis(150);

#[derive(Debug)]
pub(crate) struct SocketListener {
    endpoint: SocketEndpoint,
    socket: BoundSocket,
}

#[derive(Debug)]
enum BoundSocket {
    Tcp(TcpListener),
    Unix(UnixListener),
}

impl BoundSocket {
    fn enable_polling(&self) -> io::Result<()> {
        match self {
            Self::Tcp(listener) => listener.set_nonblocking(true),
            Self::Unix(listener) => listener.set_nonblocking(true),
        }
    }

    fn poll(&self) -> Poll {
        let accepted = match self {
            Self::Tcp(listener) => listener
                .accept()
                .map(|(stream, _)| ConnectionStream::Tcp(stream)),
            Self::Unix(listener) => listener
                .accept()
                .map(|(stream, _)| ConnectionStream::Unix(stream)),
        };
        match accepted {
            Ok(stream) => Poll::Peer(stream),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Poll::Idle,
            Err(error) => Poll::Failed(error),
        }
    }
}

enum Poll {
    Peer(ConnectionStream),
    Idle,
    Failed(io::Error),
}

/// What occupies a Unix socket path before binding.
#[derive(Debug, PartialEq, Eq)]
enum SocketFile {
    Absent,
    Stale,
    Live,
    Foreign,
}

impl SocketListener {
    pub(crate) fn bind(endpoint: &SocketEndpoint) -> Result<Self, ListenerError> {
        let socket = match endpoint {
            SocketEndpoint::Tcp { host, port } => {
                BoundSocket::Tcp(bind_tcp(endpoint, host, *port)?)
            }
            SocketEndpoint::Unix { path } => BoundSocket::Unix(bind_unix(endpoint, path)?),
        };
        let listener = Self {
            endpoint: endpoint.clone(),
            socket,
        };
        listener
            .socket
            .enable_polling()
            .map_err(|source| ListenerError::Polling {
                endpoint: endpoint.clone(),
                source,
            })?;
        info!(target: LISTENER_TARGET, endpoint = %endpoint, "waiting for peer");
        Ok(listener)
    }

    pub(crate) fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    #[cfg(test)]
    pub(crate) fn local_addr(&self) -> Option<std::net::SocketAddr> {
        match &self.socket {
            BoundSocket::Tcp(listener) => listener.local_addr().ok(),
            BoundSocket::Unix(_) => None,
        }
    }

    /// Waits for the peer and returns its connection in blocking mode.
    ///
    /// Returns `Ok(None)` once `shutdown` is raised. Accept failures are
    /// retried; each new kind of failure is logged once.
    pub(crate) fn accept_peer(
        &self,
        shutdown: &ShutdownFlag,
    ) -> Result<Option<ConnectionStream>, ListenerError> {
        let mut reported = None::<io::ErrorKind>;
        while !shutdown.is_requested() {
            match self.socket.poll() {
                Poll::Peer(stream) => {
                    return stream
                        .into_blocking()
                        .map(Some)
                        .map_err(|source| ListenerError::Handover { source });
                }
                Poll::Idle => thread::sleep(IDLE_POLL),
                Poll::Failed(error) => {
                    if reported.replace(error.kind()) != Some(error.kind()) {
                        warn!(
                            target: LISTENER_TARGET,
                            endpoint = %self.endpoint,
                            error = %error,
                            "accepting the peer failed; retrying"
                        );
                    }
                    thread::sleep(FAILURE_POLL);
                }
            }
        }
        Ok(None)
    }
}

impl Drop for SocketListener {
    fn drop(&mut self) {
        let SocketEndpoint::Unix { path } = &self.endpoint else {
            return;
        };
        if let Err(error) = fs::remove_file(path)
            && error.kind() != io::ErrorKind::NotFound
        {
            warn!(
                target: LISTENER_TARGET,
                path = %path,
                error = %error,
                "failed to remove unix socket file"
            );
        }
    }
}

fn bind_tcp(
    endpoint: &SocketEndpoint,
    host: &str,
    port: u16,
) -> Result<TcpListener, ListenerError> {
    let candidates = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            endpoint: endpoint.clone(),
            source,
        })?;
    let mut last_failure = None;
    for addr in candidates {
        match TcpListener::bind(addr) {
            Ok(listener) => return Ok(listener),
            Err(error) => last_failure = Some(error),
        }
    }
    Err(match last_failure {
        Some(source) => ListenerError::Bind {
            endpoint: endpoint.clone(),
            source,
        },
        None => ListenerError::NoAddresses {
            endpoint: endpoint.clone(),
        },
    })
}

fn bind_unix(endpoint: &SocketEndpoint, path: &Utf8Path) -> Result<UnixListener, ListenerError> {
    let reclaim_failed = |source| ListenerError::UnixReclaim {
        path: path.to_path_buf(),
        source,
    };
    match inspect_socket_file(path).map_err(reclaim_failed)? {
        SocketFile::Absent => {}
        SocketFile::Stale => {
            fs::remove_file(path).map_err(reclaim_failed)?;
            info!(target: LISTENER_TARGET, path = %path, "removed stale unix socket");
        }
        SocketFile::Live => {
            return Err(ListenerError::UnixInUse {
                path: path.to_path_buf(),
            });
        }
        SocketFile::Foreign => {
            return Err(ListenerError::UnixNotSocket {
                path: path.to_path_buf(),
            });
        }
    }
    UnixListener::bind(path).map_err(|source| ListenerError::Bind {
        endpoint: endpoint.clone(),
        source,
    })
}

fn inspect_socket_file(path: &Utf8Path) -> io::Result<SocketFile> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(SocketFile::Absent),
        Err(error) => return Err(error),
    };
    if !metadata.file_type().is_socket() {
        return Ok(SocketFile::Foreign);
    }
    match UnixStream::connect(path) {
        Ok(_) => Ok(SocketFile::Live),
        Err(error)
            if matches!(
                error.kind(),
                io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
            ) =>
        {
            Ok(SocketFile::Stale)
        }
        Err(error) => Err(error),
    }
}
