//! target memory map
//! 
//! word-addressed regions mapped into the target address space.
//! words are stored little-endian

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use dyn_clone::{clone_trait_object, DynClone};
use iset::IntervalMap;
use nohash_hasher::IntMap;

use crate::command::WORD_SIZE;
use super::Error;

/// a region of target memory
/// 
/// offsets are relative to the region base and always word aligned.
/// regions must be cloneable so a whole target can be snapshotted
pub trait MappedRegion: DynClone + Send {
    fn name(&self) -> &str;

    /// return the base address of the region
    fn base(&self) -> u64;

    /// return the size of the region in bytes
    fn size(&self) -> usize;

    fn read_word(&self, offset: u64) -> Result<u32, Error>;

    fn write_word(&mut self, offset: u64, word: u32) -> Result<(), Error>;
}

clone_trait_object!(MappedRegion);

impl fmt::Debug for dyn MappedRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {:#x}..{:#x}", self.name(), self.base(), self.base() + self.size() as u64)
    }
}

/// plain byte-backed memory
#[derive(Clone)]
pub struct Ram {
    name: String,
    base: u64,
    backing: Vec<u8>,
}

impl Ram {
    pub fn new_with(name: impl Into<String>, base: u64, size: usize) -> Self {
        Self {
            name: name.into(),
            base,
            backing: vec![0u8; size],
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.backing
    }

    fn slot(&self, offset: u64) -> Result<std::ops::Range<usize>, Error> {
        let start = offset as usize;
        if start + WORD_SIZE > self.backing.len() {
            return Err(Error::Unmapped(self.base + offset));
        }
        Ok(start..start + WORD_SIZE)
    }
}

impl MappedRegion for Ram {
    fn name(&self) -> &str {
        &self.name
    }

    fn base(&self) -> u64 {
        self.base
    }

    fn size(&self) -> usize {
        self.backing.len()
    }

    fn read_word(&self, offset: u64) -> Result<u32, Error> {
        let slot = self.slot(offset)?;
        Ok(LittleEndian::read_u32(&self.backing[slot]))
    }

    fn write_word(&mut self, offset: u64, word: u32) -> Result<(), Error> {
        let slot = self.slot(offset)?;
        LittleEndian::write_u32(&mut self.backing[slot], word);
        Ok(())
    }
}

/// a block of 32-bit registers
/// 
/// registers never written read back their reset value (0 unless set)
#[derive(Clone)]
pub struct RegisterBlock {
    name: String,
    base: u64,
    size: usize,
    values: IntMap<u64, u32>,
    resets: IntMap<u64, u32>,
}

impl RegisterBlock {
    pub fn new_with(name: impl Into<String>, base: u64, size: usize) -> Self {
        Self {
            name: name.into(),
            base,
            size,
            values: IntMap::default(),
            resets: IntMap::default(),
        }
    }

    /// set the value a register holds before it is first written
    pub fn with_reset_value(mut self, offset: u64, value: u32) -> Self {
        self.resets.insert(offset, value);
        self
    }

    /// return every register to its reset value
    pub fn restore(&mut self) {
        self.values.clear();
    }

    fn check(&self, offset: u64) -> Result<(), Error> {
        if offset as usize + WORD_SIZE > self.size {
            return Err(Error::Unmapped(self.base + offset));
        }
        Ok(())
    }
}

impl MappedRegion for RegisterBlock {
    fn name(&self) -> &str {
        &self.name
    }

    fn base(&self) -> u64 {
        self.base
    }

    fn size(&self) -> usize {
        self.size
    }

    fn read_word(&self, offset: u64) -> Result<u32, Error> {
        self.check(offset)?;
        Ok(self.values.get(&offset)
            .or_else(|| self.resets.get(&offset))
            .copied()
            .unwrap_or(0))
    }

    fn write_word(&mut self, offset: u64, word: u32) -> Result<(), Error> {
        self.check(offset)?;
        self.values.insert(offset, word);
        Ok(())
    }
}

/// non-overlapping regions indexed by address
#[derive(Clone)]
pub struct MemoryMap {
    segments: IntervalMap<u64, usize>,
    regions: Vec<Box<dyn MappedRegion>>,
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMap {
    pub fn new() -> Self {
        Self {
            segments: IntervalMap::new(),
            regions: Vec::new(),
        }
    }

    /// add a region to the map
    pub fn map_region(&mut self, region: Box<dyn MappedRegion>) -> Result<(), Error> {
        let base = region.base();
        if base % WORD_SIZE as u64 != 0 {
            return Err(Error::UnalignedAddress(base));
        }
        let end = base.checked_add(region.size() as u64)
            .filter(|end| *end > base)
            .ok_or_else(|| Error::BadRegion(region.name().to_owned()))?;

        if let Some(existing) = self.segments.intervals(base..end).next() {
            return Err(Error::MapConflict(base, existing.start));
        }

        log::debug!("map {:?}", region);
        self.regions.push(region);
        self.segments.insert(base..end, self.regions.len() - 1);
        Ok(())
    }

    pub fn regions(&self) -> impl Iterator<Item = &dyn MappedRegion> {
        self.regions.iter().map(|region| region.as_ref())
    }

    /// look up the region containing `address` and the offset into it
    fn locate(&self, address: u64) -> Result<(usize, u64), Error> {
        if address % WORD_SIZE as u64 != 0 {
            return Err(Error::UnalignedAddress(address));
        }
        let (range, idx) = self.segments.overlap(address)
            .next()
            .ok_or(Error::Unmapped(address))?;
        Ok((*idx, address - range.start))
    }

    pub fn read_word(&self, address: u64) -> Result<u32, Error> {
        let (idx, offset) = self.locate(address)?;
        self.regions[idx].read_word(offset)
    }

    pub fn write_word(&mut self, address: u64, word: u32) -> Result<(), Error> {
        let (idx, offset) = self.locate(address)?;
        self.regions[idx].write_word(offset, word)
    }
}
