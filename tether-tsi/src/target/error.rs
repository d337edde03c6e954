//! simulated target errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("access to unmapped address {0:#x}")]
    Unmapped(u64),
    #[error("address unaligned {0:#x}")]
    UnalignedAddress(u64),
    #[error("new region at {0:#x} conflicts with region at {1:#x}")]
    MapConflict(u64, u64),
    #[error("region `{0}` is empty or overflows the address space")]
    BadRegion(String),
    #[error("invalid target configuration: {0}")]
    Config(String),
    #[error("protocol error: {0}")]
    Protocol(#[from] crate::Error),
}
