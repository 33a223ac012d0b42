//! Bus transaction adapter traits.
//!
//! The dispatcher treats the adapter as an opaque capability. Production code
//! plugs in [`super::LinuxI2cProvider`]; tests plug in a recording double.

use std::io;

use super::{BusId, DeviceAddress, Register};

/// Opens buses and hands out exclusively owned handles.
pub trait BusProvider {
    /// Handle type produced for an open bus.
    type Handle: BusHandle;

    /// Opens the device node backing `bus`.
    fn open(&self, bus: BusId, device_path: &str) -> io::Result<Self::Handle>;
}

/// Addressed block transactions against one open bus.
pub trait BusHandle {
    /// Selects the peripheral that subsequent transactions talk to.
    fn select_address(&mut self, address: DeviceAddress) -> io::Result<()>;

    /// Reads up to `buffer.len()` bytes starting at `register`, returning the
    /// number of bytes the device delivered.
    fn read_block(&mut self, register: Register, buffer: &mut [u8]) -> io::Result<usize>;

    /// Writes `data` starting at `register`.
    fn write_block(&mut self, register: Register, data: &[u8]) -> io::Result<()>;

    /// Releases the handle. Consuming `self` makes use-after-close
    /// unrepresentable.
    fn close(self) -> io::Result<()>;
}
