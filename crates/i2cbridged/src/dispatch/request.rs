//! Request decoding and argument resolution.
//!
//! A request is a tuple led by a command atom. Each command accepts a closed
//! set of argument shapes; the typed variants below are what the dispatcher
//! executes. Shape matching is structural first (an integer where an integer
//! belongs, a binary where data belongs) and only then checks that values fit
//! their domain.

use crate::bus::{BusId, DeviceAddress, Register};

use super::errors::{CommandError, DecodeError};
use super::term::Term;

/// Parses one request line into a term.
///
/// Returns `Ok(None)` for blank lines.
///
/// # Errors
///
/// Returns [`DecodeError::Malformed`] when the line is not JSON. Valid JSON
/// always decodes; values outside the term model become [`Term::Opaque`].
pub fn decode_request(line: &[u8]) -> Result<Option<Term>, DecodeError> {
    let trimmed = line.trim_ascii();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(trimmed)
        .map(Some)
        .map_err(DecodeError::malformed)
}

/// Commands understood by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    OpenBus,
    CloseBus,
    ReadByte,
    WriteByte,
    GetAddress,
    SetAddress,
    GetBus,
    SetBus,
    BusInfo,
    Exit,
}

impl Command {
    /// Maps a command atom to a command.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "open_bus" => Some(Self::OpenBus),
            "close_bus" => Some(Self::CloseBus),
            "read_byte" => Some(Self::ReadByte),
            "write_byte" => Some(Self::WriteByte),
            "get_address" => Some(Self::GetAddress),
            "set_address" => Some(Self::SetAddress),
            "get_bus" => Some(Self::GetBus),
            "set_bus" => Some(Self::SetBus),
            "bus_info" => Some(Self::BusInfo),
            "exit" => Some(Self::Exit),
            _ => None,
        }
    }

    /// Canonical command atom.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenBus => "open_bus",
            Self::CloseBus => "close_bus",
            Self::ReadByte => "read_byte",
            Self::WriteByte => "write_byte",
            Self::GetAddress => "get_address",
            Self::SetAddress => "set_address",
            Self::GetBus => "get_bus",
            Self::SetBus => "set_bus",
            Self::BusInfo => "bus_info",
            Self::Exit => "exit",
        }
    }

    /// Whether the command is refused with `no_open_bus` before its
    /// arguments are examined.
    #[must_use]
    pub fn requires_open_bus(self) -> bool {
        matches!(
            self,
            Self::CloseBus
                | Self::ReadByte
                | Self::WriteByte
                | Self::SetAddress
                | Self::GetBus
                | Self::SetBus
                | Self::BusInfo
        )
    }
}

/// A request split into its command and argument terms.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    /// Identified command.
    pub command: Command,
    /// Terms following the command atom.
    pub args: &'a [Term],
}

impl<'a> Request<'a> {
    /// Splits a tuple led by a known command atom.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::UnknownCommand`] carrying the whole payload
    /// when the term is not such a tuple.
    pub fn identify(term: &'a Term) -> Result<Self, CommandError> {
        let unknown = || CommandError::UnknownCommand(term.clone());
        let Term::Tuple(items) = term else {
            return Err(unknown());
        };
        let (head, args) = items.split_first().ok_or_else(unknown)?;
        let command = head.as_atom().and_then(Command::parse).ok_or_else(unknown)?;
        Ok(Self { command, args })
    }
}

/// Addressing fields a transfer names explicitly. Omitted fields are
/// inherited from the session context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Addressing {
    /// Bus, when given.
    pub bus: Option<BusId>,
    /// Device address, when given.
    pub address: Option<DeviceAddress>,
    /// Register, when given.
    pub register: Option<Register>,
}

impl Addressing {
    fn from_leading(leading: &[i64]) -> Result<Self, CommandError> {
        let mut fields = leading.iter().rev();
        let register = fields.next().map(|value| narrow(*value)).transpose()?;
        let address = fields.next().map(|value| narrow(*value)).transpose()?;
        let bus = fields.next().map(|value| narrow(*value)).transpose()?;
        Ok(Self {
            bus,
            address,
            register,
        })
    }
}

/// `read_byte` with its addressing and requested length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRequest {
    /// Addressing as given; omitted fields come from the context.
    pub target: Addressing,
    /// Bytes to read. Checked against the block limit only after the
    /// address is selected.
    pub length: usize,
}

/// `write_byte` with its addressing and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    /// Addressing as given; omitted fields come from the context.
    pub target: Addressing,
    /// Payload written starting at the register.
    pub data: Vec<u8>,
}

/// Resolves `read_byte` arguments, most specific shape first:
/// `(bus, address, register, length)`, `(address, register, length)`,
/// `(register, length)`, `(length)`.
///
/// # Errors
///
/// Returns [`CommandError::BadArgument`] when no shape matches or a value
/// does not fit its field.
pub fn parse_read(args: &[Term]) -> Result<ReadRequest, CommandError> {
    let (leading, last) = split_transfer(args)?;
    let Term::Integer(length) = last else {
        return Err(CommandError::BadArgument);
    };
    Ok(ReadRequest {
        target: Addressing::from_leading(&leading)?,
        length: narrow(*length)?,
    })
}

/// Resolves `write_byte` arguments, most specific shape first:
/// `(bus, address, register, data)`, `(address, register, data)`,
/// `(register, data)`, `(data)`.
///
/// # Errors
///
/// Returns [`CommandError::BadArgument`] when no shape matches or a value
/// does not fit its field.
pub fn parse_write(args: &[Term]) -> Result<WriteRequest, CommandError> {
    let (leading, last) = split_transfer(args)?;
    let Term::Binary(data) = last else {
        return Err(CommandError::BadArgument);
    };
    Ok(WriteRequest {
        target: Addressing::from_leading(&leading)?,
        data: data.clone(),
    })
}

/// Splits transfer arguments into up to three leading integers and the final
/// operand. Any non-integer leading field rejects the request.
fn split_transfer(args: &[Term]) -> Result<(Vec<i64>, &Term), CommandError> {
    let (last, leading) = args.split_last().ok_or(CommandError::BadArgument)?;
    if leading.len() > 3 {
        return Err(CommandError::BadArgument);
    }
    let integers = leading
        .iter()
        .map(|term| match term {
            Term::Integer(value) => Ok(*value),
            _ => Err(CommandError::BadArgument),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((integers, last))
}

/// Parses a lone bus argument, as taken by `open_bus`, `close_bus` and
/// `set_bus`.
///
/// # Errors
///
/// Returns [`CommandError::BadArgument`] for any other shape.
pub fn parse_bus(args: &[Term]) -> Result<BusId, CommandError> {
    match args {
        [Term::Integer(bus)] => narrow(*bus),
        _ => Err(CommandError::BadArgument),
    }
}

/// Parses `()` or `(bus)`, as taken by `get_address` and `bus_info`.
///
/// # Errors
///
/// Returns [`CommandError::BadArgument`] for any other shape.
pub fn parse_optional_bus(args: &[Term]) -> Result<Option<BusId>, CommandError> {
    match args {
        [] => Ok(None),
        [Term::Integer(bus)] => narrow(*bus).map(Some),
        _ => Err(CommandError::BadArgument),
    }
}

/// Parses `(address)` or `(bus, address)` for `set_address`.
///
/// # Errors
///
/// Returns [`CommandError::BadArgument`] for any other shape.
pub fn parse_set_address(args: &[Term]) -> Result<(Option<BusId>, DeviceAddress), CommandError> {
    match args {
        [Term::Integer(address)] => Ok((None, narrow(*address)?)),
        [Term::Integer(bus), Term::Integer(address)] => {
            Ok((Some(narrow(*bus)?), narrow(*address)?))
        }
        _ => Err(CommandError::BadArgument),
    }
}

/// Requires an empty argument list.
///
/// # Errors
///
/// Returns [`CommandError::BadArgument`] when arguments are present.
pub fn expect_no_args(args: &[Term]) -> Result<(), CommandError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandError::BadArgument)
    }
}

fn narrow<T: TryFrom<i64>>(value: i64) -> Result<T, CommandError> {
    T::try_from(value).map_err(|_| CommandError::BadArgument)
}
