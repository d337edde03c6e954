//! session harness
//! 
//! ties a host program, the word channel and a simulated target to one
//! clock. every step hands control to the host once, moves at most one
//! word in each direction and advances the target once.

use tether_sim::channel::{ChannelLogger, Link};
use tether_sim::{self as sim, Clock, Clocked, Simulation};

use crate::config::SessionConfig;
use crate::target::SimTarget;
use crate::{Host, Tsi};

pub struct Session {
    clock: Clock,
    tsi: Tsi,
    target: SimTarget,
    to_target: Link,
    to_host: Link,
}

impl Session {
    pub fn new<F>(program: F) -> Result<Self, anyhow::Error>
    where
        F: FnOnce(&mut Host) -> anyhow::Result<()> + Send + 'static,
    {
        Self::new_with(&SessionConfig::default(), program)
    }

    /// build a session, the host program starts running immediately
    pub fn new_with<F>(config: &SessionConfig, program: F) -> Result<Self, anyhow::Error>
    where
        F: FnOnce(&mut Host) -> anyhow::Result<()> + Send + 'static,
    {
        let clock = Clock::new_with(config.clock_resolution)?;
        let target = SimTarget::new_with(&config.target, config.tsi.control)?;
        let tsi = Tsi::new_with(config.tsi, program)?;
        Ok(Self {
            clock,
            tsi,
            target,
            to_target: Link::new_with("host->target"),
            to_host: Link::new_with("target->host"),
        })
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn tsi(&self) -> &Tsi {
        &self.tsi
    }

    pub fn target(&self) -> &SimTarget {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut SimTarget {
        &mut self.target
    }

    /// logger for words sent to the target
    pub fn outbound_logger(&mut self) -> ChannelLogger {
        self.to_target.get_logger()
    }

    /// logger for words received from the target
    pub fn inbound_logger(&mut self) -> ChannelLogger {
        self.to_host.get_logger()
    }

    /// true once the host program finished and nothing is in flight
    pub fn is_quiescent(&self) -> bool {
        self.tsi.host_finished() && self.tsi.queues().is_drained() && self.target.is_idle()
    }

    /// run at most `steps` steps, stopping early once quiescent
    /// 
    /// returns the number of steps taken
    pub fn run_for(&mut self, steps: usize) -> Result<usize, sim::Error> {
        for taken in 0..steps {
            if self.is_quiescent() {
                return Ok(taken);
            }
            self.step()?;
        }
        Ok(steps)
    }
}

impl Simulation for Session {
    fn step(&mut self) -> Result<(), sim::Error> {
        let time = self.clock.now();
        Clocked::step(&mut self.tsi)?;
        self.to_target.step(time, &mut self.tsi, &mut self.target);
        Clocked::step(&mut self.target)?;
        self.to_host.step(time, &mut self.target, &mut self.tsi);
        self.clock.tick();
        Ok(())
    }

    /// run until the host program finished and every word was delivered
    /// 
    /// a host blocked on a read the target never answers keeps this
    /// running forever
    fn run(&mut self) -> Result<(), sim::Error> {
        while !self.is_quiescent() {
            Simulation::step(self)?;
        }
        log::info!("session quiescent after {} steps", self.clock.now());
        Ok(())
    }
}

