//! control registers
//! 
//! the handful of target registers the host pokes to bring the target
//! out of reset and to start the resident program

use crate::command::WORD_SIZE;
use crate::config::ControlMap;
use crate::{Error, Host};

/// base of the system control registers
pub const SCR_BASE: u64 = 0x11_0000;
/// base of the per-hart software interrupt pending registers
pub const MSIP_BASE: u64 = 0x200_0000;
/// maximum number of harts with an interrupt register
pub const NHARTS_MAX: usize = 16;

/// system control registers, as offsets from the scr base
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u64)]
pub enum ScrRegister {
    Boot = 0x00,
    Switcher = 0x04,
    HbwifReset = 0x08,
    BhReset = 0x0c,
    RsReset = 0x10,
    UncoreClkDivisor = 0x20,
    BhClkDivisor = 0x24,
    RsClkDivisor = 0x28,
    BhOutClkDivisor = 0x2c,
    RsOutClkDivisor = 0x30,
    LbwifClkDivisor = 0x34,
    UncorePassClkSel = 0x50,
    BhPassClkSel = 0x54,
    RsPassClkSel = 0x58,
    LbwifPassClkSel = 0x5c,
}

impl ScrRegister {
    /// registers holding a subsystem in reset, released by `reset`
    pub const RESETS: [Self; 2] = [Self::BhReset, Self::RsReset];

    pub fn offset(self) -> u64 {
        self as u64
    }
}

impl ControlMap {
    /// absolute address of a system control register
    pub fn scr(&self, register: ScrRegister) -> u64 {
        self.scr_base + register.offset()
    }

    /// absolute address of a hart's software interrupt register
    pub fn msip(&self, hart: usize) -> Result<u64, Error> {
        if hart >= self.max_harts {
            return Err(Error::Hart(hart, self.max_harts));
        }
        Ok(self.msip_base + (hart * WORD_SIZE) as u64)
    }

    /// software interrupt register of every hart
    pub fn ipi_addresses(&self) -> Vec<u64> {
        (0..self.max_harts)
            .map(|hart| self.msip_base + (hart * WORD_SIZE) as u64)
            .collect()
    }
}

impl Host {
    /// write a system control register
    pub fn write_scr(&mut self, register: ScrRegister, value: u32) -> Result<(), Error> {
        let address = self.config().control.scr(register);
        self.write_chunk(address, WORD_SIZE, &[value])
    }

    /// raise the software interrupt of `hart`
    pub fn send_ipi(&mut self, hart: usize) -> Result<(), Error> {
        let address = self.config().control.msip(hart)?;
        self.write_chunk(address, WORD_SIZE, &[1])
    }

    /// interrupt hart 0 so it starts executing the program in memory
    pub fn start_program(&mut self) -> Result<(), Error> {
        log::info!("start program");
        self.send_ipi(0)
    }

    /// release the target subsystems from reset
    pub fn reset(&mut self) -> Result<(), Error> {
        log::info!("reset");
        for register in ScrRegister::RESETS {
            self.write_scr(register, 0)?;
        }
        Ok(())
    }
}
