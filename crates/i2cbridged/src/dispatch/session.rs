//! Bus registry and addressing context bundled for one connection.

use tracing::{debug, warn};

use crate::bus::{
    BusEntry, BusHandle, BusId, BusProvider, BusRegistry, BusSummary, DeviceAddress,
    MAX_BLOCK_LEN, Register, os_error_text,
};

use super::context::{ResolvedTarget, SessionContext};
use super::errors::{CommandError, TransferDirection};
use super::request::{Addressing, ReadRequest, WriteRequest};
use super::router::DISPATCH_TARGET;

/// Mutable state a dispatcher works against.
pub struct BusSession<P: BusProvider> {
    registry: BusRegistry<P>,
    context: SessionContext,
}

impl<P: BusProvider> BusSession<P> {
    /// Starts a session with an empty context.
    pub fn new(registry: BusRegistry<P>) -> Self {
        Self {
            registry,
            context: SessionContext::default(),
        }
    }

    /// Open buses.
    #[must_use]
    pub fn registry(&self) -> &BusRegistry<P> {
        &self.registry
    }

    /// Current addressing defaults.
    #[must_use]
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Opens `bus` and makes it current.
    pub fn open_bus(&mut self, bus: BusId) -> Result<BusId, CommandError> {
        self.registry.open(bus)?;
        self.context.set_bus(bus);
        Ok(bus)
    }

    /// Closes `bus`. The context keeps pointing at it if it was current.
    pub fn close_bus(&mut self, bus: BusId) -> Result<(), CommandError> {
        self.registry.close(bus)?;
        Ok(())
    }

    /// Performs a block read, returning the bytes the device delivered.
    pub fn read(&mut self, request: ReadRequest) -> Result<Vec<u8>, CommandError> {
        let ReadRequest { target, length } = request;
        self.transfer(target, |handle, register| {
            if length > MAX_BLOCK_LEN {
                return Err(CommandError::PayloadTooLarge {
                    direction: TransferDirection::Read,
                });
            }
            let mut buffer = vec![0_u8; length];
            let received = handle
                .read_block(register, &mut buffer)
                .map_err(|error| CommandError::TransactionFailed(os_error_text(&error)))?;
            buffer.truncate(received);
            Ok(buffer)
        })
    }

    /// Performs a block write, returning the number of bytes written.
    pub fn write(&mut self, request: WriteRequest) -> Result<usize, CommandError> {
        let WriteRequest { target, data } = request;
        self.transfer(target, |handle, register| {
            if data.len() > MAX_BLOCK_LEN {
                return Err(CommandError::PayloadTooLarge {
                    direction: TransferDirection::Write,
                });
            }
            handle
                .write_block(register, &data)
                .map_err(|error| CommandError::TransactionFailed(os_error_text(&error)))?;
            Ok(data.len())
        })
    }

    /// Runs one transfer against a resolved target.
    ///
    /// A failed address selection leaves every cache untouched. Once the
    /// address is in place the context advances to the resolved values
    /// whether or not the transfer succeeds; the bus register cache only
    /// moves on success.
    fn transfer<T>(
        &mut self,
        target: Addressing,
        operation: impl FnOnce(&mut P::Handle, Register) -> Result<T, CommandError>,
    ) -> Result<T, CommandError> {
        let resolved = self.context.resolve(target)?;
        let registry_is_empty = self.registry.is_empty();
        let entry = self
            .registry
            .lookup_mut(resolved.bus)
            .ok_or_else(|| CommandError::missing_bus(registry_is_empty))?;

        if let Err(error) = entry.ensure_address(resolved.address) {
            let text = os_error_text(&error);
            warn!(
                target: DISPATCH_TARGET,
                bus = resolved.bus,
                address = resolved.address,
                error = %text,
                "address selection failed"
            );
            return Err(CommandError::AddressSelectionFailed(text));
        }

        let outcome = operation(entry.handle_mut(), resolved.register);
        if outcome.is_ok() {
            entry.record_register(resolved.register);
        }
        log_transfer(&resolved, outcome.as_ref().err());
        self.context.advance(resolved);
        outcome
    }

    /// Cached address of `bus`, or of the current bus when omitted.
    pub fn address(&self, bus: Option<BusId>) -> Result<DeviceAddress, CommandError> {
        let bus = match bus {
            Some(bus) => bus,
            None => self.context.current_bus().ok_or(CommandError::NoCurrentBus)?,
        };
        self.registry
            .lookup(bus)
            .map(BusEntry::cached_address)
            .ok_or(CommandError::BusNotOpen)
    }

    /// Selects `address` on `bus` (or the current bus), always calling the
    /// adapter. The context changes only when the adapter accepts it.
    pub fn set_address(
        &mut self,
        bus: Option<BusId>,
        address: DeviceAddress,
    ) -> Result<DeviceAddress, CommandError> {
        let target_bus = match bus {
            Some(bus) => bus,
            None => self.context.current_bus().ok_or(CommandError::NoCurrentBus)?,
        };
        let registry_is_empty = self.registry.is_empty();
        let entry = self
            .registry
            .lookup_mut(target_bus)
            .ok_or_else(|| CommandError::missing_bus(registry_is_empty))?;
        entry
            .select_address(address)
            .map_err(|error| CommandError::AddressRejected(os_error_text(&error)))?;
        if bus.is_some() {
            self.context.set_bus(target_bus);
        }
        self.context.set_address(address);
        Ok(address)
    }

    /// The current bus.
    pub fn current_bus(&self) -> Result<BusId, CommandError> {
        self.context.current_bus().ok_or(CommandError::NoCurrentBus)
    }

    /// Makes an open bus current.
    pub fn set_current_bus(&mut self, bus: BusId) -> Result<BusId, CommandError> {
        if self.registry.lookup(bus).is_none() {
            return Err(CommandError::missing_bus(self.registry.is_empty()));
        }
        self.context.set_bus(bus);
        Ok(bus)
    }

    /// Diagnostics for one bus.
    pub fn bus_info(&self, bus: BusId) -> Result<BusSummary, CommandError> {
        self.registry
            .lookup(bus)
            .map(BusEntry::summary)
            .ok_or_else(|| CommandError::missing_bus(self.registry.is_empty()))
    }

    /// Diagnostics for every open bus in ascending order.
    #[must_use]
    pub fn all_bus_info(&self) -> Vec<BusSummary> {
        self.registry.enumerate()
    }

    /// Whether no bus is open.
    #[must_use]
    pub fn has_no_open_bus(&self) -> bool {
        self.registry.is_empty()
    }

    /// Closes every bus, returning how many were open.
    pub fn teardown(&mut self) -> usize {
        self.registry.close_all()
    }
}

fn log_transfer(target: &ResolvedTarget, error: Option<&CommandError>) {
    match error {
        None => debug!(
            target: DISPATCH_TARGET,
            bus = target.bus,
            address = target.address,
            register = target.register,
            "transfer completed"
        ),
        Some(error) => warn!(
            target: DISPATCH_TARGET,
            bus = target.bus,
            address = target.address,
            register = target.register,
            error = %error,
            "transfer failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use i2cbridge_config::DeviceTemplate;
    use nix::errno::Errno;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::tests::support::{BusCall, FailurePoint, RecordingBusProvider};

    struct Harness {
        provider: RecordingBusProvider,
        session: BusSession<RecordingBusProvider>,
    }

    #[fixture]
    fn harness() -> Harness {
        let provider = RecordingBusProvider::default();
        let registry = BusRegistry::new(provider.clone(), DeviceTemplate::default());
        Harness {
            provider,
            session: BusSession::new(registry),
        }
    }

    fn full(bus: BusId, address: DeviceAddress, register: Register) -> Addressing {
        Addressing {
            bus: Some(bus),
            address: Some(address),
            register: Some(register),
        }
    }

    #[rstest]
    fn open_bus_makes_the_bus_current(mut harness: Harness) {
        harness.session.open_bus(3).expect("open");
        assert_eq!(harness.session.current_bus(), Ok(3));
    }

    #[rstest]
    fn write_then_read_round_trips(mut harness: Harness) {
        harness.session.open_bus(1).expect("open");
        let written = harness
            .session
            .write(WriteRequest {
                target: full(1, 0x50, 0x10),
                data: vec![1, 2, 3],
            })
            .expect("write");
        let read = harness
            .session
            .read(ReadRequest {
                target: full(1, 0x50, 0x10),
                length: 3,
            })
            .expect("read");
        assert_eq!(written, 3);
        assert_eq!(read, vec![1, 2, 3]);
    }

    #[rstest]
    fn oversized_reads_never_reach_the_adapter(mut harness: Harness) {
        harness.session.open_bus(1).expect("open");
        let error = harness
            .session
            .read(ReadRequest {
                target: full(1, 0, 0),
                length: MAX_BLOCK_LEN + 1,
            })
            .expect_err("too large");
        assert_eq!(
            error,
            CommandError::PayloadTooLarge {
                direction: TransferDirection::Read
            }
        );
        assert_eq!(harness.provider.transaction_count(), 0);
    }

    #[rstest]
    fn failed_transfer_still_advances_the_context(mut harness: Harness) {
        harness.session.open_bus(1).expect("open");
        harness.provider.fail_on(FailurePoint::Read, 1, Errno::EIO);
        let error = harness
            .session
            .read(ReadRequest {
                target: full(1, 0x50, 0x10),
                length: 2,
            })
            .expect_err("read fails");
        assert_eq!(
            error,
            CommandError::TransactionFailed(Errno::EIO.desc().to_owned())
        );
        let context = harness.session.context();
        assert_eq!(context.current_address(), 0x50);
        assert_eq!(context.current_register(), 0x10);
        let info = harness.session.bus_info(1).expect("bus open");
        assert_eq!(info.address, 0x50);
        assert_eq!(info.register, 0);
    }

    #[rstest]
    fn failed_selection_leaves_the_context_alone(mut harness: Harness) {
        harness.session.open_bus(1).expect("open");
        harness.provider.fail_on(FailurePoint::Select, 1, Errno::EBUSY);
        let error = harness
            .session
            .read(ReadRequest {
                target: full(1, 0x50, 0x10),
                length: 2,
            })
            .expect_err("selection fails");
        assert!(matches!(error, CommandError::AddressSelectionFailed(_)));
        assert_eq!(harness.session.context().current_address(), 0);
        assert_eq!(harness.session.context().current_register(), 0);
        assert_eq!(harness.provider.transaction_count(), 0);
    }

    #[rstest]
    fn set_address_always_calls_the_adapter(mut harness: Harness) {
        harness.session.open_bus(1).expect("open");
        harness.session.set_address(None, 0x50).expect("first");
        harness.session.set_address(None, 0x50).expect("second");
        let selections = harness
            .provider
            .calls()
            .into_iter()
            .filter(|call| matches!(call, BusCall::Select { .. }))
            .count();
        assert_eq!(selections, 2);
    }

    #[rstest]
    fn rejected_set_address_keeps_the_current_bus(mut harness: Harness) {
        harness.session.open_bus(1).expect("open 1");
        harness.session.open_bus(2).expect("open 2");
        harness.provider.fail_on(FailurePoint::Select, 1, Errno::ENXIO);
        let error = harness
            .session
            .set_address(Some(1), 0x50)
            .expect_err("rejected");
        assert_eq!(
            error,
            CommandError::AddressRejected("No such device or address".to_owned())
        );
        assert_eq!(harness.session.current_bus(), Ok(2));
    }

    #[rstest]
    fn set_current_bus_requires_an_open_bus(mut harness: Harness) {
        assert_eq!(
            harness.session.set_current_bus(1),
            Err(CommandError::NoOpenBus)
        );
        harness.session.open_bus(1).expect("open");
        assert_eq!(
            harness.session.set_current_bus(2),
            Err(CommandError::BusNotOpen)
        );
    }
}
