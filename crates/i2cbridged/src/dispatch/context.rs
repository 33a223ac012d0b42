//! Session addressing context.
//!
//! The context holds defaults for under-specified requests. Authoritative
//! per-bus state lives in the registry; resolved values are checked against,
//! and written back into, the target bus entry by the session.

use crate::bus::{BusId, DeviceAddress, Register};

use super::errors::CommandError;
use super::request::Addressing;

/// Fully specified transfer target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Bus the transfer runs on.
    pub bus: BusId,
    /// Peripheral selected before the transfer.
    pub address: DeviceAddress,
    /// First register of the block.
    pub register: Register,
}

/// Current bus, address and register for one connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionContext {
    current_bus: Option<BusId>,
    current_address: DeviceAddress,
    current_register: Register,
}

impl SessionContext {
    /// Bus used when a request omits it, once one has been referenced.
    #[must_use]
    pub fn current_bus(&self) -> Option<BusId> {
        self.current_bus
    }

    /// Address used when a request omits it.
    #[must_use]
    pub fn current_address(&self) -> DeviceAddress {
        self.current_address
    }

    /// Register used when a request omits it.
    #[must_use]
    pub fn current_register(&self) -> Register {
        self.current_register
    }

    /// Fills omitted fields from the context.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::NoCurrentBus`] when the bus is omitted and no
    /// bus has been referenced yet.
    pub fn resolve(&self, target: Addressing) -> Result<ResolvedTarget, CommandError> {
        let bus = target
            .bus
            .or(self.current_bus)
            .ok_or(CommandError::NoCurrentBus)?;
        Ok(ResolvedTarget {
            bus,
            address: target.address.unwrap_or(self.current_address),
            register: target.register.unwrap_or(self.current_register),
        })
    }

    /// Moves every field to the values of an attempted transfer.
    pub fn advance(&mut self, target: ResolvedTarget) {
        self.current_bus = Some(target.bus);
        self.current_address = target.address;
        self.current_register = target.register;
    }

    pub(crate) fn set_bus(&mut self, bus: BusId) {
        self.current_bus = Some(bus);
    }

    pub(crate) fn set_address(&mut self, address: DeviceAddress) {
        self.current_address = address;
    }
}
