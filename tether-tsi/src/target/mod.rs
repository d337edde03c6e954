//! simulated target
//! 
//! a memory-only stand-in for the target side of the serial interface.
//! it parses the command stream arriving from the host, applies writes
//! to its memory map and streams back read data. it does not execute
//! anything, the control registers only record what the host wrote

use std::collections::VecDeque;

use tether_sim::{self as sim, Clocked, WordSink, WordSource};

use crate::command::{Decoded, Header, Opcode, Parser, WORD_SIZE};
use crate::config::{ControlMap, RegionKind, TargetConfig};
use crate::control::ScrRegister;

pub mod error;
pub mod memory;

pub use error::Error;
pub use memory::{MappedRegion, MemoryMap, Ram, RegisterBlock};

/// size of the system control register block
pub const SCR_SIZE: usize = 0x1000;

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct TargetStats {
    pub reads: usize,
    pub writes: usize,
    pub words_read: usize,
    pub words_written: usize,
}

/// a read that is still streaming its data back
#[derive(Clone, Copy, Debug)]
struct PendingRead {
    address: u64,
    remaining: usize,
}

#[derive(Clone)]
pub struct SimTarget {
    memory: MemoryMap,
    control: ControlMap,
    parser: Parser,
    rx: VecDeque<u32>,
    tx: VecDeque<u32>,
    rx_depth: usize,
    pending: Option<PendingRead>,
    stats: TargetStats,
}

impl SimTarget {
    /// build a target with the configured regions and the control
    /// register blocks described by `control`
    /// 
    /// both subsystem reset registers come up asserted
    pub fn new_with(config: &TargetConfig, control: ControlMap) -> Result<Self, Error> {
        if config.rx_depth == 0 {
            return Err(Error::Config(String::from("rx_depth must be at least 1")));
        }

        let mut memory = MemoryMap::new();
        for region in config.regions.iter() {
            let region: Box<dyn MappedRegion> = match region.kind {
                RegionKind::Ram => Box::new(Ram::new_with(&region.name, region.base, region.size)),
                RegionKind::Registers => {
                    Box::new(RegisterBlock::new_with(&region.name, region.base, region.size))
                }
            };
            memory.map_region(region)?;
        }

        let scr = ScrRegister::RESETS.iter()
            .fold(RegisterBlock::new_with("scr", control.scr_base, SCR_SIZE), |scr, reg| {
                scr.with_reset_value(reg.offset(), 1)
            });
        memory.map_region(Box::new(scr))?;
        memory.map_region(Box::new(RegisterBlock::new_with(
            "msip",
            control.msip_base,
            control.max_harts * WORD_SIZE,
        )))?;

        Ok(Self {
            memory,
            control,
            parser: Parser::new(),
            rx: VecDeque::with_capacity(config.rx_depth),
            tx: VecDeque::new(),
            rx_depth: config.rx_depth,
            pending: None,
            stats: TargetStats::default(),
        })
    }

    pub fn memory(&self) -> &MemoryMap {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MemoryMap {
        &mut self.memory
    }

    pub fn stats(&self) -> TargetStats {
        self.stats
    }

    /// true once every subsystem reset register has been released
    pub fn is_live(&self) -> bool {
        ScrRegister::RESETS.iter().all(|reg| {
            self.memory.read_word(self.control.scr(*reg)).map_or(false, |v| v == 0)
        })
    }

    /// true if the software interrupt of `hart` has been raised
    pub fn started(&self, hart: usize) -> bool {
        self.control.msip(hart)
            .ok()
            .and_then(|address| self.memory.read_word(address).ok())
            .map_or(false, |v| v != 0)
    }

    /// true if no command is in flight and both fifos are empty
    pub fn is_idle(&self) -> bool {
        self.rx.is_empty() && self.tx.is_empty() && self.pending.is_none() && self.parser.is_idle()
    }

    /// advance the target by one step
    /// 
    /// an in-flight read emits one word per step and holds off further
    /// commands, otherwise one received word is consumed
    pub fn advance(&mut self) -> Result<(), Error> {
        if let Some(PendingRead { address, remaining }) = self.pending {
            let word = self.memory.read_word(address)?;
            self.tx.push_back(word);
            self.stats.words_read += 1;
            self.pending = (remaining > 1).then(|| PendingRead {
                address: address + WORD_SIZE as u64,
                remaining: remaining - 1,
            });
            return Ok(());
        }

        let Some(word) = self.rx.pop_front() else {
            return Ok(());
        };
        match self.parser.push(word)? {
            Some(Decoded::Header(Header { opcode: Opcode::Read, address, words })) => {
                log::debug!("target read {:#x} ({} words)", address, words);
                self.stats.reads += 1;
                self.pending = Some(PendingRead { address, remaining: words });
            }
            Some(Decoded::Header(Header { opcode: Opcode::Write, address, words })) => {
                log::debug!("target write {:#x} ({} words)", address, words);
                self.stats.writes += 1;
            }
            Some(Decoded::Payload { address, word }) => {
                self.memory.write_word(address, word)?;
                self.stats.words_written += 1;
            }
            None => (),
        }
        Ok(())
    }
}

impl Clocked for SimTarget {
    fn step(&mut self) -> Result<(), sim::Error> {
        self.advance().map_err(sim::Error::clocked)
    }
}

// host to target direction
impl WordSink for SimTarget {
    fn ready(&self) -> bool {
        self.rx.len() < self.rx_depth
    }

    fn accept(&mut self, word: u32) {
        self.rx.push_back(word)
    }
}

// target to host direction
impl WordSource for SimTarget {
    fn valid(&self) -> bool {
        !self.tx.is_empty()
    }

    fn bits(&self) -> u32 {
        self.tx.front().copied().unwrap_or_default()
    }

    fn fire(&mut self) {
        self.tx.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;

    fn target() -> SimTarget {
        SimTarget::new_with(&TargetConfig::default(), ControlMap::default())
            .expect("failed to build target")
    }

    fn feed(target: &mut SimTarget, words: &[u32]) {
        for word in words {
            target.accept(*word);
            target.advance().expect("target step failed");
        }
    }

    #[test]
    fn test_write_then_read() {
        let mut target = target();
        feed(&mut target, &Command::write(0x8000_0000, 8, &[5, 6]).unwrap().encode());
        feed(&mut target, &Command::read(0x8000_0000, 8).unwrap().encode());

        // read data streams out one word per step
        assert!(!target.valid());
        target.advance().unwrap();
        target.advance().unwrap();
        let mut out = Vec::new();
        while target.valid() {
            out.push(target.bits());
            target.fire();
        }
        assert_eq!(out, [5, 6]);
        assert!(target.is_idle());
        assert_eq!(target.stats(), TargetStats { reads: 1, writes: 1, words_read: 2, words_written: 2 });
    }

    #[test]
    fn test_reset_and_start_status() {
        let mut target = target();
        let control = ControlMap::default();
        assert!(!target.is_live());
        assert!(!target.started(0));

        feed(&mut target, &Command::write(control.scr(ScrRegister::BhReset), 4, &[0]).unwrap().encode());
        assert!(!target.is_live());
        feed(&mut target, &Command::write(control.scr(ScrRegister::RsReset), 4, &[0]).unwrap().encode());
        assert!(target.is_live());

        feed(&mut target, &Command::write(control.msip(0).unwrap(), 4, &[1]).unwrap().encode());
        assert!(target.started(0));
        assert!(!target.started(1));
    }

    #[test]
    fn test_unmapped_write_fails() {
        let mut target = target();
        let words = Command::write(0x10, 4, &[1]).unwrap().encode();
        let (last, header) = words.split_last().unwrap();
        feed(&mut target, header);
        target.accept(*last);
        assert!(matches!(target.advance(), Err(Error::Unmapped(0x10))));
    }

    #[test]
    fn test_rx_backpressure() {
        let config = TargetConfig { rx_depth: 2, ..TargetConfig::default() };
        let mut target = SimTarget::new_with(&config, ControlMap::default()).unwrap();
        target.accept(0);
        assert!(target.ready());
        target.accept(0);
        assert!(!target.ready());
        target.advance().unwrap();
        assert!(target.ready());
    }
}
