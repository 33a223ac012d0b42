//! Connection loop for the single peer.
//!
//! Requests are handled strictly in arrival order: one line is decoded,
//! dispatched against the session and answered before the next is read.

use std::fmt;
use std::io::{Read, Write};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::bus::BusProvider;
use crate::process::ShutdownFlag;
use crate::transport::{ConnectionStream, Frame, RequestReader, TransportError};

use super::request::decode_request;
use super::response::ResponseWriter;
use super::router::{CommandDispatcher, Control, DISPATCH_TARGET};
use super::session::BusSession;

/// How long a read blocks before the shutdown flag is checked again.
pub(crate) const READ_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Why a session ended without a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The peer sent `exit`.
    ExitRequested,
    /// The peer closed the connection.
    Disconnected,
    /// A termination signal arrived.
    Shutdown,
}

impl SessionEnd {
    /// Stable label used in logs and health events.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExitRequested => "exit_requested",
            Self::Disconnected => "disconnected",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serves one peer connection against a bus session.
pub struct ConnectionLoop<P: BusProvider> {
    dispatcher: CommandDispatcher,
    session: BusSession<P>,
    shutdown: ShutdownFlag,
}

impl<P: BusProvider> ConnectionLoop<P> {
    /// Creates a loop over a fresh session.
    pub fn new(
        dispatcher: CommandDispatcher,
        session: BusSession<P>,
        shutdown: ShutdownFlag,
    ) -> Self {
        Self {
            dispatcher,
            session,
            shutdown,
        }
    }

    /// The session the loop works against.
    #[must_use]
    pub fn session(&self) -> &BusSession<P> {
        &self.session
    }

    /// Serves an accepted connection until it ends.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the connection fails or a request
    /// line is malformed. Open buses stay open until [`Self::teardown`].
    pub fn serve(&mut self, stream: &mut ConnectionStream) -> Result<SessionEnd, TransportError> {
        stream.set_read_timeout(Some(READ_POLL_INTERVAL))?;
        self.run(stream)
    }

    pub(crate) fn run<S: Read + Write>(
        &mut self,
        stream: &mut S,
    ) -> Result<SessionEnd, TransportError> {
        let mut reader = RequestReader::new();
        loop {
            let line = match reader.next_frame(stream, &self.shutdown)? {
                Frame::Line(line) => line,
                Frame::Closed => {
                    debug!(target: DISPATCH_TARGET, "peer closed the connection");
                    return Ok(SessionEnd::Disconnected);
                }
                Frame::ShutdownRequested => {
                    info!(target: DISPATCH_TARGET, "shutdown requested while waiting for peer");
                    return Ok(SessionEnd::Shutdown);
                }
            };
            let request = match decode_request(&line) {
                Ok(Some(request)) => request,
                Ok(None) => continue,
                Err(error) => {
                    warn!(target: DISPATCH_TARGET, %error, "malformed request");
                    return Err(error.into());
                }
            };

            let dispatch = self.dispatcher.dispatch(&request, &mut self.session);
            ResponseWriter::new(&mut *stream).write_reply(&dispatch.reply)?;
            if dispatch.control == Control::Exit {
                info!(target: DISPATCH_TARGET, "peer requested exit");
                return Ok(SessionEnd::ExitRequested);
            }
        }
    }

    /// Closes every open bus, returning how many were open.
    pub fn teardown(&mut self) -> usize {
        let closed = self.session.teardown();
        info!(target: DISPATCH_TARGET, closed, "bus session torn down");
        closed
    }
}
