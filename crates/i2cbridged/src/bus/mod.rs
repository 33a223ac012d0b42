//! Hardware bus layer: the transaction adapter seam, the Linux i2c-dev
//! adapter, and the registry of currently open buses.

mod adapter;
mod errors;
mod linux;
mod os_error;
mod registry;

pub use self::adapter::{BusHandle, BusProvider};
pub use self::errors::RegistryError;
pub use self::linux::{LinuxI2cHandle, LinuxI2cProvider};
pub use self::os_error::os_error_text;
pub use self::registry::{BusEntry, BusRegistry, BusSummary};

/// Identifier of a bus, matching the `N` in `/dev/i2c-N`.
pub type BusId = u32;

/// Address of a peripheral on a bus (7-bit, or 10-bit where supported).
pub type DeviceAddress = u16;

/// Register offset within the selected peripheral.
pub type Register = u8;

/// Largest payload a single block transaction may carry.
pub const MAX_BLOCK_LEN: usize = 32;

/// Tracing target for bus operations.
pub(crate) const BUS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bus");
