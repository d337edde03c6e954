//! simulation types

use crate::Error;

/// simulation time, in clock steps
pub type Time = usize;

/// the time source shared by everything stepped in one simulation
/// 
/// one step is `resolution` simulated seconds
#[derive(Clone, Debug)]
pub struct Clock {
    resolution: f64,
    now: Time,
}

impl Default for Clock {
    fn default() -> Self {
        Self { resolution: crate::MIN_QUANT, now: 0 }
    }
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// create a clock stepping `resolution` seconds at a time
    pub fn new_with(resolution: f64) -> Result<Self, Error> {
        // also rejects NaN
        if !(resolution >= crate::MIN_QUANT) {
            return Err(Error::Clock(format!(
                "resolution {resolution} is finer than {}", crate::MIN_QUANT)));
        }
        Ok(Self { resolution, now: 0 })
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// steps taken since the clock was created
    pub fn now(&self) -> Time {
        self.now
    }

    pub fn tick(&mut self) {
        self.advance(1)
    }

    pub fn advance(&mut self, steps: Time) {
        self.now += steps
    }

    /// simulated seconds since the clock was created
    pub fn elapsed_seconds(&self) -> f64 {
        self.now as f64 * self.resolution
    }
}
