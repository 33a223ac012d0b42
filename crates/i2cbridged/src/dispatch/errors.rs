//! Error types for request dispatch.
//!
//! [`CommandError`] covers every way a single request can fail. It never
//! escapes the dispatcher: each variant renders to the structured result the
//! peer receives. [`DecodeError`] is a framing failure and ends the session.

use thiserror::Error;

use crate::bus::{RegistryError, os_error_text};

use super::term::Term;

/// Direction of a block transfer, used to pick the oversize reason atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    /// Bytes flow from the device.
    Read,
    /// Bytes flow to the device.
    Write,
}

/// Failures of a single command, reported back to the peer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    /// Arguments did not match any accepted shape or were out of range.
    #[error("bad argument")]
    BadArgument,
    /// The bus is already open.
    #[error("bus already open")]
    AlreadyOpen,
    /// The referenced bus is not open.
    #[error("bus not open")]
    BusNotOpen,
    /// No bus is open at all.
    #[error("no open bus")]
    NoOpenBus,
    /// The request relies on a current bus that was never established.
    #[error("no current bus")]
    NoCurrentBus,
    /// The device node could not be opened.
    #[error("failed to open device: {0}")]
    DeviceOpen(String),
    /// An explicit `set_address` was refused by the adapter.
    #[error("address rejected: {0}")]
    AddressRejected(String),
    /// Address selection ahead of a transfer failed.
    #[error("address selection failed: {0}")]
    AddressSelectionFailed(String),
    /// The block transfer itself failed.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),
    /// The transfer exceeds the block limit.
    #[error("payload exceeds the block limit")]
    PayloadTooLarge {
        /// Transfer direction.
        direction: TransferDirection,
    },
    /// The request does not name a known command.
    #[error("unknown command")]
    UnknownCommand(Term),
}

impl CommandError {
    /// Renders the error as the result half of a reply.
    #[must_use]
    pub fn into_result_term(self) -> Term {
        match self {
            Self::BadArgument => error_atom("badarg"),
            Self::AlreadyOpen => error_atom("already_open"),
            Self::BusNotOpen => error_atom("bus_not_open"),
            Self::NoOpenBus => error_atom("no_open_bus"),
            Self::NoCurrentBus => error_atom("no_current_bus"),
            Self::DeviceOpen(text) | Self::AddressRejected(text) => {
                Term::failure("error", Term::string(text), None)
            }
            Self::AddressSelectionFailed(text) => {
                Term::failure("address_error", Term::string(text), None)
            }
            Self::TransactionFailed(text) => Term::failure("i2c_error", Term::string(text), None),
            Self::PayloadTooLarge {
                direction: TransferDirection::Read,
            } => error_atom("too_much_data_requested"),
            Self::PayloadTooLarge {
                direction: TransferDirection::Write,
            } => error_atom("too_much_data"),
            Self::UnknownCommand(payload) => {
                Term::failure("error", Term::atom("unknown_command"), Some(payload))
            }
        }
    }

    /// Chooses between `NoOpenBus` and `BusNotOpen` for a failed lookup.
    pub(crate) fn missing_bus(registry_is_empty: bool) -> Self {
        if registry_is_empty {
            Self::NoOpenBus
        } else {
            Self::BusNotOpen
        }
    }
}

fn error_atom(reason: &str) -> Term {
    Term::failure("error", Term::atom(reason), None)
}

impl From<RegistryError> for CommandError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::AlreadyOpen { .. } => Self::AlreadyOpen,
            RegistryError::BusNotOpen { .. } => Self::BusNotOpen,
            RegistryError::NoOpenBus => Self::NoOpenBus,
            RegistryError::Open { source, .. } => Self::DeviceOpen(os_error_text(&source)),
        }
    }
}

/// A request line that cannot be turned into a [`Term`].
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The line is not JSON.
    #[error("malformed request line: {source}")]
    Malformed {
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    pub(crate) fn malformed(source: serde_json::Error) -> Self {
        Self::Malformed { source }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use nix::errno::Errno;
    use rstest::rstest;

    use super::*;

    fn render(error: CommandError) -> String {
        serde_json::to_string(&error.into_result_term()).expect("encode term")
    }

    #[rstest]
    #[case::badarg(CommandError::BadArgument, r#"["error","badarg"]"#)]
    #[case::already_open(CommandError::AlreadyOpen, r#"["error","already_open"]"#)]
    #[case::bus_not_open(CommandError::BusNotOpen, r#"["error","bus_not_open"]"#)]
    #[case::no_open_bus(CommandError::NoOpenBus, r#"["error","no_open_bus"]"#)]
    #[case::no_current_bus(CommandError::NoCurrentBus, r#"["error","no_current_bus"]"#)]
    #[case::read_limit(
        CommandError::PayloadTooLarge { direction: TransferDirection::Read },
        r#"["error","too_much_data_requested"]"#
    )]
    #[case::write_limit(
        CommandError::PayloadTooLarge { direction: TransferDirection::Write },
        r#"["error","too_much_data"]"#
    )]
    #[case::address(
        CommandError::AddressSelectionFailed("Device or resource busy".to_owned()),
        r#"["address_error",{"string":"Device or resource busy"}]"#
    )]
    #[case::transaction(
        CommandError::TransactionFailed("Input/output error".to_owned()),
        r#"["i2c_error",{"string":"Input/output error"}]"#
    )]
    #[case::unknown(
        CommandError::UnknownCommand(Term::tuple([Term::atom("reboot")])),
        r#"["error","unknown_command",["reboot"]]"#
    )]
    fn renders_result_terms(#[case] error: CommandError, #[case] expected: &str) {
        assert_eq!(render(error), expected);
    }

    #[test]
    fn open_failures_carry_strerror_text() {
        let error = CommandError::from(RegistryError::Open {
            bus: 7,
            path: "/dev/i2c-7".to_owned(),
            source: io::Error::from_raw_os_error(Errno::ENOENT as i32),
        });
        assert_eq!(
            render(error),
            r#"["error",{"string":"No such file or directory"}]"#
        );
    }
}
