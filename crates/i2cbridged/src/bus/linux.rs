//! Linux i2c-dev adapter.
//!
//! Device selection uses the `I2C_SLAVE` ioctl; data transfers use SMBus
//! "I2C block" transactions through the `I2C_SMBUS` ioctl, laid out exactly
//! as `<linux/i2c-dev.h>` and libi2c do.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsRawFd, IntoRawFd};

use nix::libc::c_int;

use super::{BusHandle, BusId, BusProvider, DeviceAddress, MAX_BLOCK_LEN, Register};

const I2C_SLAVE: u16 = 0x0703;
const I2C_SMBUS: u16 = 0x0720;

const I2C_SMBUS_WRITE: u8 = 0;
const I2C_SMBUS_READ: u8 = 1;

const I2C_SMBUS_I2C_BLOCK_BROKEN: u32 = 6;
const I2C_SMBUS_I2C_BLOCK_DATA: u32 = 8;

/// Mirrors `union i2c_smbus_data`: a length byte, up to 32 payload bytes and
/// one spare byte for PEC.
#[repr(C, align(2))]
struct SmbusData {
    block: [u8; MAX_BLOCK_LEN + 2],
}

/// Mirrors `struct i2c_smbus_ioctl_data`.
#[repr(C)]
struct SmbusIoctlData {
    read_write: u8,
    command: u8,
    size: u32,
    data: *mut SmbusData,
}

nix::ioctl_write_int_bad!(i2c_set_slave, I2C_SLAVE);
nix::ioctl_write_ptr_bad!(i2c_smbus_access, I2C_SMBUS, SmbusIoctlData);

impl SmbusData {
    fn with_length(length: u8) -> Self {
        let mut block = [0_u8; MAX_BLOCK_LEN + 2];
        block[0] = length;
        Self { block }
    }

    fn for_write(payload: &[u8]) -> io::Result<Self> {
        let length = block_length(payload.len())?;
        let mut data = Self::with_length(length);
        data.block[1..=payload.len()].copy_from_slice(payload);
        Ok(data)
    }

    fn received(&self, requested: usize) -> &[u8] {
        let delivered = usize::from(self.block[0]).min(requested);
        &self.block[1..=delivered]
    }
}

fn block_length(length: usize) -> io::Result<u8> {
    if length > MAX_BLOCK_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "block transfers carry at most 32 bytes",
        ));
    }
    u8::try_from(length).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))
}

/// Full-length reads go through the "broken" transaction type, like libi2c.
fn read_transaction_size(length: usize) -> u32 {
    if length == MAX_BLOCK_LEN {
        I2C_SMBUS_I2C_BLOCK_BROKEN
    } else {
        I2C_SMBUS_I2C_BLOCK_DATA
    }
}

/// Opens `/dev/i2c-N` style character devices.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxI2cProvider;

impl LinuxI2cProvider {
    /// Builds a provider.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl BusProvider for LinuxI2cProvider {
    type Handle = LinuxI2cHandle;

    fn open(&self, _bus: BusId, device_path: &str) -> io::Result<Self::Handle> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(device_path)?;
        Ok(LinuxI2cHandle { file })
    }
}

/// Open i2c-dev file descriptor.
#[derive(Debug)]
pub struct LinuxI2cHandle {
    file: File,
}

impl LinuxI2cHandle {
    fn smbus_access(
        &self,
        read_write: u8,
        command: Register,
        size: u32,
        data: &mut SmbusData,
    ) -> io::Result<()> {
        let request = SmbusIoctlData {
            read_write,
            command,
            size,
            data: std::ptr::from_mut(data),
        };
        // SAFETY: `request` and the buffer it points to outlive the call and
        // match the kernel's layout.
        unsafe { i2c_smbus_access(self.file.as_raw_fd(), &request) }
            .map(|_| ())
            .map_err(io::Error::from)
    }
}

impl BusHandle for LinuxI2cHandle {
    fn select_address(&mut self, address: DeviceAddress) -> io::Result<()> {
        // SAFETY: I2C_SLAVE takes the address by value; no memory is shared.
        unsafe { i2c_set_slave(self.file.as_raw_fd(), c_int::from(address)) }
            .map(|_| ())
            .map_err(io::Error::from)
    }

    fn read_block(&mut self, register: Register, buffer: &mut [u8]) -> io::Result<usize> {
        let requested = buffer.len();
        let mut data = SmbusData::with_length(block_length(requested)?);
        self.smbus_access(
            I2C_SMBUS_READ,
            register,
            read_transaction_size(requested),
            &mut data,
        )?;
        let received = data.received(requested);
        buffer[..received.len()].copy_from_slice(received);
        Ok(received.len())
    }

    fn write_block(&mut self, register: Register, payload: &[u8]) -> io::Result<()> {
        let mut data = SmbusData::for_write(payload)?;
        self.smbus_access(
            I2C_SMBUS_WRITE,
            register,
            I2C_SMBUS_I2C_BLOCK_BROKEN,
            &mut data,
        )
    }

    fn close(self) -> io::Result<()> {
        nix::unistd::close(self.file.into_raw_fd()).map_err(io::Error::from)
    }
}
