//! tsi errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("size unaligned {0:#x}, expected {1:#x}-aligned")]
    UnalignedSize(usize, usize),
    #[error("empty transfer at {0:#x}")]
    EmptyTransfer(u64),
    #[error("payload of {found} words does not match transfer of {expected} words")]
    PayloadLength { expected: usize, found: usize },
    #[error("transfer of {1:#x} bytes at {0:#x} overflows the address space")]
    AddressOverflow(u64, usize),
    #[error("invalid command opcode {0:#x}")]
    Opcode(u32),
    #[error("hart {0} out of range, target supports {1} harts")]
    Hart(usize, usize),
    #[error("target context is gone")]
    TargetGone,
    #[error("host context is gone")]
    HostGone,
    #[error("host program failed: {0}")]
    Host(anyhow::Error),
    #[error(transparent)]
    Config(#[from] crate::config::Error),
    #[error("failed to spawn host context: {0}")]
    Spawn(std::io::Error),
}
