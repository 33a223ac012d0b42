//! Recording double for the bus adapter.
//!
//! Every adapter invocation is recorded, including ones that fail, so tests
//! can assert exactly what reached the hardware seam. Register blocks are
//! kept in memory per bus, device address and starting register.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use nix::errno::Errno;

use crate::bus::{BusHandle, BusId, BusProvider, DeviceAddress, Register};

/// Adapter invocations observed by the double.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusCall {
    Open {
        bus: BusId,
        path: String,
    },
    Select {
        bus: BusId,
        address: DeviceAddress,
    },
    Read {
        bus: BusId,
        address: DeviceAddress,
        register: Register,
        length: usize,
    },
    Write {
        bus: BusId,
        address: DeviceAddress,
        register: Register,
        data: Vec<u8>,
    },
    Close {
        bus: BusId,
    },
}

/// Adapter operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    Open,
    Select,
    Read,
    Write,
    Close,
}

#[derive(Debug, Default)]
struct BusState {
    calls: Vec<BusCall>,
    failures: HashMap<(FailurePoint, BusId), Errno>,
    memory: HashMap<(BusId, DeviceAddress, Register), Vec<u8>>,
}

impl BusState {
    fn check(&self, point: FailurePoint, bus: BusId) -> io::Result<()> {
        match self.failures.get(&(point, bus)) {
            Some(errno) => Err(io::Error::from_raw_os_error(*errno as i32)),
            None => Ok(()),
        }
    }
}

/// Provider whose handles share one recorded state.
#[derive(Debug, Clone, Default)]
pub struct RecordingBusProvider {
    state: Arc<Mutex<BusState>>,
}

impl RecordingBusProvider {
    /// Makes every later `point` operation on `bus` fail with `errno`.
    pub fn fail_on(&self, point: FailurePoint, bus: BusId, errno: Errno) {
        self.lock().failures.insert((point, bus), errno);
    }

    /// Seeds the block a read of `register` on `address` returns.
    pub fn store(&self, bus: BusId, address: DeviceAddress, register: Register, data: &[u8]) {
        self.lock()
            .memory
            .insert((bus, address, register), data.to_vec());
    }

    /// Every recorded invocation in order.
    pub fn calls(&self) -> Vec<BusCall> {
        self.lock().calls.clone()
    }

    /// Number of read and write transactions that reached the adapter.
    pub fn transaction_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, BusCall::Read { .. } | BusCall::Write { .. }))
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().expect("bus state mutex poisoned")
    }
}

impl BusProvider for RecordingBusProvider {
    type Handle = RecordingBusHandle;

    fn open(&self, bus: BusId, device_path: &str) -> io::Result<Self::Handle> {
        let mut state = self.lock();
        state.calls.push(BusCall::Open {
            bus,
            path: device_path.to_owned(),
        });
        state.check(FailurePoint::Open, bus)?;
        Ok(RecordingBusHandle {
            bus,
            selected: 0,
            state: Arc::clone(&self.state),
        })
    }
}

/// Handle produced by [`RecordingBusProvider`].
#[derive(Debug)]
pub struct RecordingBusHandle {
    bus: BusId,
    selected: DeviceAddress,
    state: Arc<Mutex<BusState>>,
}

impl RecordingBusHandle {
    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().expect("bus state mutex poisoned")
    }
}

impl BusHandle for RecordingBusHandle {
    fn select_address(&mut self, address: DeviceAddress) -> io::Result<()> {
        {
            let mut state = self.lock();
            state.calls.push(BusCall::Select {
                bus: self.bus,
                address,
            });
            state.check(FailurePoint::Select, self.bus)?;
        }
        self.selected = address;
        Ok(())
    }

    fn read_block(&mut self, register: Register, buffer: &mut [u8]) -> io::Result<usize> {
        let mut state = self.lock();
        state.calls.push(BusCall::Read {
            bus: self.bus,
            address: self.selected,
            register,
            length: buffer.len(),
        });
        state.check(FailurePoint::Read, self.bus)?;
        buffer.fill(0);
        if let Some(stored) = state.memory.get(&(self.bus, self.selected, register)) {
            let len = stored.len().min(buffer.len());
            buffer[..len].copy_from_slice(&stored[..len]);
        }
        Ok(buffer.len())
    }

    fn write_block(&mut self, register: Register, data: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        state.calls.push(BusCall::Write {
            bus: self.bus,
            address: self.selected,
            register,
            data: data.to_vec(),
        });
        state.check(FailurePoint::Write, self.bus)?;
        state
            .memory
            .insert((self.bus, self.selected, register), data.to_vec());
        Ok(())
    }

    fn close(self) -> io::Result<()> {
        let mut state = self.lock();
        state.calls.push(BusCall::Close { bus: self.bus });
        state.check(FailurePoint::Close, self.bus)
    }
}
