//! Error types for the listener and the peer connection.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

use i2cbridge_config::SocketEndpoint;

use crate::dispatch::DecodeError;

/// Errors surfaced while binding the listener or waiting for the peer.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The TCP host name did not resolve.
    #[error("failed to resolve {endpoint}: {source}")]
    Resolve {
        endpoint: SocketEndpoint,
        #[source]
        source: io::Error,
    },
    #[error("{endpoint} resolved to no addresses")]
    NoAddresses { endpoint: SocketEndpoint },
    /// Binding failed; for TCP this is the error of the last address tried.
    #[error("failed to bind {endpoint}: {source}")]
    Bind {
        endpoint: SocketEndpoint,
        #[source]
        source: io::Error,
    },
    #[error("failed to poll {endpoint} for the peer: {source}")]
    Polling {
        endpoint: SocketEndpoint,
        #[source]
        source: io::Error,
    },
    #[error("failed to hand over the peer connection: {source}")]
    Handover {
        #[source]
        source: io::Error,
    },
    /// Another process still answers on the socket file.
    #[error("unix socket {path} is still served by another process")]
    UnixInUse { path: Utf8PathBuf },
    #[error("{path} exists and is not a unix socket")]
    UnixNotSocket { path: Utf8PathBuf },
    /// Inspecting or removing a leftover socket file failed.
    #[error("failed to reclaim unix socket {path}: {source}")]
    UnixReclaim {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Fatal failures on the peer connection. Each one ends the session.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Reading or writing the connection failed.
    #[error("connection IO failed: {0}")]
    Io(#[from] io::Error),
    /// A request line exceeded the framing limit.
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    RequestTooLarge { size: usize, max_size: usize },
    /// A request line could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}
