//! Registry of open buses keyed by bus identifier.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use i2cbridge_config::DeviceTemplate;
use tracing::{info, warn};

use super::{BUS_TARGET, BusHandle, BusId, BusProvider, DeviceAddress, Register, RegistryError};

/// One open bus together with the addressing state last applied to it.
#[derive(Debug)]
pub struct BusEntry<H> {
    id: BusId,
    device_path: String,
    handle: H,
    cached_address: DeviceAddress,
    cached_register: Register,
}

impl<H: BusHandle> BusEntry<H> {
    fn new(id: BusId, device_path: String, handle: H) -> Self {
        Self {
            id,
            device_path,
            handle,
            cached_address: 0,
            cached_register: 0,
        }
    }

    /// Device node the bus was opened from.
    #[must_use]
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Device address last selected on this bus.
    #[must_use]
    pub fn cached_address(&self) -> DeviceAddress {
        self.cached_address
    }

    /// Register last transferred on this bus.
    #[must_use]
    pub fn cached_register(&self) -> Register {
        self.cached_register
    }

    /// Selects `address` unless it is already the cached selection.
    ///
    /// The cache only moves when the adapter accepts the address.
    pub fn ensure_address(&mut self, address: DeviceAddress) -> std::io::Result<()> {
        if address == self.cached_address {
            return Ok(());
        }
        self.select_address(address)
    }

    /// Selects `address` unconditionally and caches it on success.
    pub fn select_address(&mut self, address: DeviceAddress) -> std::io::Result<()> {
        self.handle.select_address(address)?;
        self.cached_address = address;
        Ok(())
    }

    /// Records the register of a completed transfer.
    pub fn record_register(&mut self, register: Register) {
        self.cached_register = register;
    }

    /// Mutable access to the adapter handle for data transfers.
    pub fn handle_mut(&mut self) -> &mut H {
        &mut self.handle
    }

    /// Snapshot of the entry for diagnostics.
    #[must_use]
    pub fn summary(&self) -> BusSummary {
        BusSummary {
            bus: self.id,
            device_path: self.device_path.clone(),
            address: self.cached_address,
            register: self.cached_register,
        }
    }

    fn release(self) {
        let Self {
            id,
            device_path,
            handle,
            ..
        } = self;
        match handle.close() {
            Ok(()) => info!(target: BUS_TARGET, bus = id, path = %device_path, "bus closed"),
            Err(error) => warn!(
                target: BUS_TARGET,
                bus = id,
                path = %device_path,
                error = %error,
                "failed to close bus; entry removed regardless"
            ),
        }
    }
}

/// Diagnostic view of an open bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusSummary {
    /// Bus identifier.
    pub bus: BusId,
    /// Device node backing the bus.
    pub device_path: String,
    /// Cached device address.
    pub address: DeviceAddress,
    /// Cached register.
    pub register: Register,
}

/// Owns every open bus. Dropping the registry closes whatever is still open.
pub struct BusRegistry<P: BusProvider> {
    provider: P,
    template: DeviceTemplate,
    entries: BTreeMap<BusId, BusEntry<P::Handle>>,
}

impl<P: BusProvider> BusRegistry<P> {
    /// Creates an empty registry that opens devices through `provider`.
    pub fn new(provider: P, template: DeviceTemplate) -> Self {
        Self {
            provider,
            template,
            entries: BTreeMap::new(),
        }
    }

    /// Opens `bus` and inserts a fresh entry with cleared caches.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyOpen`] when the bus already has an
    /// entry, or [`RegistryError::Open`] when the device cannot be opened.
    pub fn open(&mut self, bus: BusId) -> Result<&mut BusEntry<P::Handle>, RegistryError> {
        let slot = match self.entries.entry(bus) {
            Entry::Occupied(_) => return Err(RegistryError::AlreadyOpen { bus }),
            Entry::Vacant(slot) => slot,
        };
        let path = self.template.expand(bus);
        let handle = self
            .provider
            .open(bus, &path)
            .map_err(|source| RegistryError::Open {
                bus,
                path: path.clone(),
                source,
            })?;
        info!(target: BUS_TARGET, bus, path = %path, "bus opened");
        Ok(slot.insert(BusEntry::new(bus, path, handle)))
    }

    /// Releases `bus` and removes its entry.
    ///
    /// A failing release is logged; the entry is removed either way.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoOpenBus`] when nothing is open and
    /// [`RegistryError::BusNotOpen`] when `bus` has no entry.
    pub fn close(&mut self, bus: BusId) -> Result<(), RegistryError> {
        if self.entries.is_empty() {
            return Err(RegistryError::NoOpenBus);
        }
        let entry = self
            .entries
            .remove(&bus)
            .ok_or(RegistryError::BusNotOpen { bus })?;
        entry.release();
        Ok(())
    }

    /// Looks up an open bus.
    #[must_use]
    pub fn lookup(&self, bus: BusId) -> Option<&BusEntry<P::Handle>> {
        self.entries.get(&bus)
    }

    /// Looks up an open bus for mutation.
    pub fn lookup_mut(&mut self, bus: BusId) -> Option<&mut BusEntry<P::Handle>> {
        self.entries.get_mut(&bus)
    }

    /// Summaries of every open bus in ascending bus order.
    #[must_use]
    pub fn enumerate(&self) -> Vec<BusSummary> {
        self.entries.values().map(BusEntry::summary).collect()
    }

    /// Whether no bus is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of open buses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Releases every open bus and returns how many were closed.
    pub fn close_all(&mut self) -> usize {
        let entries = std::mem::take(&mut self.entries);
        let closed = entries.len();
        for entry in entries.into_values() {
            entry.release();
        }
        closed
    }
}

impl<P: BusProvider> Drop for BusRegistry<P> {
    fn drop(&mut self) {
        self.close_all();
    }
}
