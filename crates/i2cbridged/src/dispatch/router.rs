//! Command routing.
//!
//! The dispatcher takes one decoded request, resolves it against the session
//! and produces a reply. It holds no state of its own between requests.

use tracing::debug;

use crate::bus::{BusProvider, BusSummary};

use super::errors::CommandError;
use super::request::{
    Command, Request, expect_no_args, parse_bus, parse_optional_bus, parse_read,
    parse_set_address, parse_write,
};
use super::session::BusSession;
use super::term::Term;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Whether the connection loop keeps going after a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Wait for the next request.
    Continue,
    /// The peer asked the bridge to exit.
    Exit,
}

/// Reply to one request plus the loop decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    /// Complete reply, `(tag, result)`.
    pub reply: Term,
    /// Loop decision.
    pub control: Control,
}

/// Routes requests to session operations and shapes replies.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    reply_tag: String,
}

impl CommandDispatcher {
    /// Creates a dispatcher whose replies are tagged with `reply_tag`.
    pub fn new(reply_tag: impl Into<String>) -> Self {
        Self {
            reply_tag: reply_tag.into(),
        }
    }

    /// Handles one request.
    pub fn dispatch<P: BusProvider>(
        &self,
        request: &Term,
        session: &mut BusSession<P>,
    ) -> Dispatch {
        let (result, control) = match Request::identify(request) {
            Ok(request) => {
                debug!(
                    target: DISPATCH_TARGET,
                    command = request.command.as_str(),
                    arity = request.args.len(),
                    "dispatching request"
                );
                let control = if request.command == Command::Exit && request.args.is_empty() {
                    Control::Exit
                } else {
                    Control::Continue
                };
                (route(request, session), control)
            }
            Err(error) => {
                debug!(target: DISPATCH_TARGET, payload = ?request, "unknown command");
                (Err(error), Control::Continue)
            }
        };
        let result = result.unwrap_or_else(CommandError::into_result_term);
        Dispatch {
            reply: Term::tuple([Term::atom(self.reply_tag.as_str()), result]),
            control,
        }
    }
}

fn route<P: BusProvider>(
    request: Request<'_>,
    session: &mut BusSession<P>,
) -> Result<Term, CommandError> {
    let Request { command, args } = request;
    if command.requires_open_bus() && session.has_no_open_bus() {
        return Err(CommandError::NoOpenBus);
    }
    match command {
        Command::OpenBus => {
            let bus = session.open_bus(parse_bus(args)?)?;
            Ok(Term::ok([Term::unsigned(bus)]))
        }
        Command::CloseBus => {
            session.close_bus(parse_bus(args)?)?;
            Ok(Term::ok([]))
        }
        Command::ReadByte => {
            let data = session.read(parse_read(args)?)?;
            Ok(Term::ok([count(data.len()), Term::Binary(data)]))
        }
        Command::WriteByte => {
            let written = session.write(parse_write(args)?)?;
            Ok(Term::ok([count(written)]))
        }
        Command::GetAddress => {
            let address = session.address(parse_optional_bus(args)?)?;
            Ok(Term::ok([Term::unsigned(address)]))
        }
        Command::SetAddress => {
            let (bus, address) = parse_set_address(args)?;
            let address = session.set_address(bus, address)?;
            Ok(Term::ok([Term::unsigned(address)]))
        }
        Command::GetBus => {
            expect_no_args(args)?;
            Ok(Term::ok([Term::unsigned(session.current_bus()?)]))
        }
        Command::SetBus => {
            let bus = session.set_current_bus(parse_bus(args)?)?;
            Ok(Term::ok([Term::unsigned(bus)]))
        }
        Command::BusInfo => match parse_optional_bus(args)? {
            Some(bus) => Ok(Term::ok([info_term(&session.bus_info(bus)?)])),
            None => {
                let all = session.all_bus_info().iter().map(info_term).collect();
                Ok(Term::ok([Term::List(all)]))
            }
        },
        Command::Exit => {
            expect_no_args(args)?;
            Ok(Term::ok([Term::atom("exiting")]))
        }
    }
}

fn count(value: usize) -> Term {
    Term::Integer(i64::try_from(value).unwrap_or(i64::MAX))
}

fn info_term(summary: &BusSummary) -> Term {
    let pair = |key: &str, value: Term| Term::tuple([Term::atom(key), value]);
    Term::List(vec![
        pair("bus_number", Term::unsigned(summary.bus)),
        pair("bus_device", Term::string(summary.device_path.as_str())),
        pair("device_address", Term::unsigned(summary.address)),
        pair("device_register", Term::unsigned(summary.register)),
    ])
}
