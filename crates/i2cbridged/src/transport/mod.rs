//! Socket transport for the single peer.
//!
//! The listener binds the configured endpoint and hands over one accepted
//! connection. Requests and replies travel on it as JSON lines.

mod errors;
mod listener;
mod reader;
mod stream;

pub use self::errors::{ListenerError, TransportError};
pub(crate) use self::listener::SocketListener;
pub(crate) use self::reader::{Frame, RequestReader};
pub use self::stream::ConnectionStream;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
