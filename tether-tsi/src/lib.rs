//! tethered serial interface
//! 
//! drives the memory and control registers of a target that cannot load
//! programs or do I/O on its own. the host side encodes read and write
//! commands into 32-bit words, the target side moves those words over a
//! word channel and feeds responses back. host program and target share
//! one timeline through a cooperative hand-off, see [`sched`].

pub mod command;
pub mod config;
pub mod control;
pub mod error;
pub mod host;
pub mod memif;
pub mod queue;
pub mod sched;
pub mod session;
pub mod target;

pub use command::{Command, Opcode};
pub use config::{SessionConfig, TsiConfig};
pub use control::ScrRegister;
pub use error::Error;
pub use host::Host;
pub use queue::Queues;
pub use sched::{HostState, Tsi};
pub use session::Session;
pub use target::SimTarget;
