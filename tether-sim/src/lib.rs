//! simulation module
//! 
//! the simulation module contains functionality for
//! advancing a tethered target and the wires attached to it

pub mod channel;
pub mod traits;
pub mod error;
pub mod types;

pub use error::*;
pub use traits::*;
pub use types::*;

/// global minimum simulation time resolution
pub const MIN_QUANT: f64 = 1e-9;
