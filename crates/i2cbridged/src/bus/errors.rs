use std::io;

use thiserror::Error;

use super::BusId;

/// Errors surfaced by [`super::BusRegistry`].
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The bus already has an entry; opening is rejected rather than merged.
    #[error("bus {bus} is already open")]
    AlreadyOpen { bus: BusId },
    /// The bus has no entry.
    #[error("bus {bus} is not open")]
    BusNotOpen { bus: BusId },
    /// No bus is open at all.
    #[error("no bus is open")]
    NoOpenBus,
    /// The adapter could not open the device node.
    #[error("failed to open bus {bus} at '{path}': {source}")]
    Open {
        bus: BusId,
        path: String,
        #[source]
        source: io::Error,
    },
}
