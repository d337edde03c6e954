pub use tether_sim as sim;
pub use tether_tsi as tsi;

pub use tether_tsi::{Host, Session, Tsi};
