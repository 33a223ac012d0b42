//! Request dispatch for the bridge.
//!
//! The peer sends one term per line and receives one reply per request:
//!
//! ```json
//! ["read_byte", 1, 80, 16, 3]
//! ```
//!
//! ```json
//! ["i2cbridge", ["ok", 3, {"binary": [1, 2, 3]}]]
//! ```
//!
//! Transfer commands accept variable arity. Omitted leading fields (bus,
//! address, register) are filled from the [`SessionContext`], which advances
//! after every transfer that reached the adapter. Command failures are
//! replies, never session errors; only malformed framing ends a session.

mod context;
mod errors;
mod handler;
mod request;
mod response;
mod router;
mod session;
mod term;

pub use self::context::{ResolvedTarget, SessionContext};
pub use self::errors::{CommandError, DecodeError, TransferDirection};
pub use self::handler::{ConnectionLoop, SessionEnd};
pub use self::request::{
    Addressing, Command, ReadRequest, Request, WriteRequest, decode_request,
};
pub use self::response::ResponseWriter;
pub use self::router::{CommandDispatcher, Control, Dispatch};
pub use self::session::BusSession;
pub use self::term::Term;
