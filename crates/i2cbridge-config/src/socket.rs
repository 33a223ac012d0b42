//! Listen endpoint for the single peer connection.
//!
//! The bridge serves exactly one peer, reached either over TCP (the classic
//! deployment next to a remote controller) or over a Unix domain socket when
//! the controller runs on the same board. Endpoints are written as URLs:
//! `tcp://host[:port]` or `unix:///absolute/path`.

use std::fmt;
use std::fs::DirBuilder;
use std::io;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::defaults::DEFAULT_TCP_PORT;

/// Where the bridge waits for its peer.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum SocketEndpoint {
    /// Unix domain socket at `path`.
    Unix { path: Utf8PathBuf },
    /// TCP listener on `host:port`.
    Tcp { host: String, port: u16 },
}

impl SocketEndpoint {
    /// Builds a Unix domain socket endpoint.
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// Builds a TCP socket endpoint.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Ensures a Unix socket can be bound by creating its directory,
    /// readable by the owner only. TCP endpoints are always ready.
    ///
    /// # Errors
    ///
    /// Returns [`SocketPreparationError`] when the path is bare or the
    /// directory cannot be created.
    pub fn prepare_filesystem(&self) -> Result<(), SocketPreparationError> {
        let Self::Unix { path } = self else {
            return Ok(());
        };
        let directory = socket_directory(path)?;

        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        match builder.create(directory.as_std_path()) {
            Err(source) if source.kind() != io::ErrorKind::AlreadyExists => {
                Err(SocketPreparationError::CreateDirectory {
                    path: directory.to_path_buf(),
                    source,
                })
            }
            _ => Ok(()),
        }
    }
}

fn socket_directory(path: &Utf8Path) -> Result<&Utf8Path, SocketPreparationError> {
    path.parent()
        .filter(|parent| !parent.as_str().is_empty())
        .ok_or_else(|| SocketPreparationError::MissingParent {
            path: path.to_path_buf(),
        })
}

impl fmt::Display for SocketEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix { path } => write!(formatter, "unix://{path}"),
            Self::Tcp { host, port } => write!(formatter, "tcp://{host}:{port}"),
        }
    }
}

impl FromStr for SocketEndpoint {
    type Err = SocketParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input).map_err(|source| SocketParseError::Url {
            input: input.to_owned(),
            source,
        })?;
        match url.scheme() {
            "tcp" => {
                let host = url
                    .host_str()
                    .filter(|host| !host.is_empty())
                    .ok_or_else(|| SocketParseError::MissingHost(input.to_owned()))?;
                Ok(Self::tcp(host, url.port().unwrap_or(DEFAULT_TCP_PORT)))
            }
            "unix" => match url.path() {
                "" | "/" => Err(SocketParseError::MissingUnixPath(input.to_owned())),
                path => Ok(Self::unix(path)),
            },
            _ => Err(SocketParseError::UnsupportedScheme(input.to_owned())),
        }
    }
}

/// Reasons a listen socket string is rejected.
#[derive(Debug, Error)]
pub enum SocketParseError {
    /// The text is not a URL at all.
    #[error("listen socket '{input}' is not a URL: {source}")]
    Url {
        /// Text as given.
        input: String,
        /// URL parser diagnostic.
        #[source]
        source: url::ParseError,
    },
    /// Neither `tcp://` nor `unix://`.
    #[error("listen socket '{0}' must use tcp:// or unix://")]
    UnsupportedScheme(String),
    /// `tcp://` without a host.
    #[error("listen socket '{0}' names no TCP host")]
    MissingHost(String),
    /// `unix://` without a path.
    #[error("listen socket '{0}' names no socket path")]
    MissingUnixPath(String),
}

/// Errors raised when preparing a Unix socket directory.
#[derive(Debug, Error)]
pub enum SocketPreparationError {
    /// The socket path is a bare file name.
    #[error("socket path '{path}' has no parent directory")]
    MissingParent { path: Utf8PathBuf },
    /// The directory could not be created.
    #[error("failed to create socket directory '{path}': {source}")]
    CreateDirectory {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}
