//! simulation traits
//! 
//! defines the traits that drive a simulation forward and
//! the word-level producer/consumer boundary used by channels

use crate::Error;

/// simulation trait
/// 
/// a simulation advances its components one clock step at a time
pub trait Simulation {

    /// advance every component by a single clock step
    fn step(&mut self) -> Result<(), Error>;

    /// run the simulation until its halt condition is detected
    fn run(&mut self) -> Result<(), Error>;
}

/// clocked trait
/// 
/// implementation implies that actions must be taken
/// at each step of the simulation clock.
/// components are stepped in the order the simulation registers them
pub trait Clocked {

    /// the step method is invoked once per simulation clock cycle
    fn step(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// producer side of a word channel
/// 
/// `bits` is only meaningful while `valid` holds.
/// `fire` is called exactly once for every word the consumer accepted
pub trait WordSource {
    fn valid(&self) -> bool;
    fn bits(&self) -> u32;
    fn fire(&mut self);
}

/// consumer side of a word channel
pub trait WordSink {
    fn ready(&self) -> bool;
    fn accept(&mut self, word: u32);
}
