//! memory interface
//! 
//! byte-granular access to target memory on top of the word-sized
//! chunk commands. spans are widened to the chunk alignment and split
//! into chunks of at most `chunk_max_size` bytes. partially covered
//! words are read back and merged before a write.

use byteorder::{ByteOrder, LittleEndian};

use crate::{Error, Host};

impl Host {
    /// read `len` bytes starting at `address`
    pub fn read_bytes(&mut self, address: u64, len: usize) -> Result<Vec<u8>, Error> {
        if len == 0 {
            return Ok(Vec::new());
        }
        let (start, size) = self.aligned_span(address, len)?;
        let span = self.read_aligned(start, size)?;
        let offset = (address - start) as usize;
        Ok(span[offset..offset + len].to_vec())
    }

    /// write `bytes` starting at `address`
    pub fn write_bytes(&mut self, address: u64, bytes: &[u8]) -> Result<(), Error> {
        if bytes.is_empty() {
            return Ok(());
        }
        let align = self.config().chunk_align;
        let (start, size) = self.aligned_span(address, bytes.len())?;
        let offset = (address - start) as usize;
        let tail = size - offset - bytes.len();

        let mut span = vec![0u8; size];
        if offset != 0 {
            let head = self.read_aligned(start, align)?;
            span[..align].copy_from_slice(&head);
        }
        if tail != 0 && (offset == 0 || size > align) {
            let last = self.read_aligned(start + (size - align) as u64, align)?;
            span[size - align..].copy_from_slice(&last);
        }
        span[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.write_aligned(start, &span)
    }

    pub fn read_u32(&mut self, address: u64) -> Result<u32, Error> {
        let bytes = self.read_bytes(address, 4)?;
        Ok(LittleEndian::read_u32(&bytes))
    }

    pub fn write_u32(&mut self, address: u64, value: u32) -> Result<(), Error> {
        let mut bytes = [0u8; 4];
        LittleEndian::write_u32(&mut bytes, value);
        self.write_bytes(address, &bytes)
    }

    pub fn read_u64(&mut self, address: u64) -> Result<u64, Error> {
        let bytes = self.read_bytes(address, 8)?;
        Ok(LittleEndian::read_u64(&bytes))
    }

    pub fn write_u64(&mut self, address: u64, value: u64) -> Result<(), Error> {
        let mut bytes = [0u8; 8];
        LittleEndian::write_u64(&mut bytes, value);
        self.write_bytes(address, &bytes)
    }

    /// smallest chunk-aligned span covering `len > 0` bytes at `address`
    /// 
    /// returns the span start and its size in bytes. the span may end
    /// exactly at the top of the address space
    fn aligned_span(&self, address: u64, len: usize) -> Result<(u64, usize), Error> {
        let mask = self.config().chunk_align as u64 - 1;
        let start = address & !mask;
        let last = (len as u64)
            .checked_sub(1)
            .and_then(|extra| address.checked_add(extra))
            .ok_or(Error::AddressOverflow(address, len))?
            | mask;
        let size = (last - start)
            .checked_add(1)
            .and_then(|size| usize::try_from(size).ok())
            .ok_or(Error::AddressOverflow(address, len))?;
        Ok((start, size))
    }

    fn read_aligned(&mut self, address: u64, len: usize) -> Result<Vec<u8>, Error> {
        let max = self.config().chunk_max_size;
        let mut bytes = vec![0u8; len];
        for (i, chunk) in bytes.chunks_mut(max).enumerate() {
            let words = self.read_chunk(address + (i * max) as u64, chunk.len())?;
            LittleEndian::write_u32_into(&words, chunk);
        }
        Ok(bytes)
    }

    fn write_aligned(&mut self, address: u64, bytes: &[u8]) -> Result<(), Error> {
        let max = self.config().chunk_max_size;
        for (i, chunk) in bytes.chunks(max).enumerate() {
            let mut words = vec![0u32; chunk.len() / 4];
            LittleEndian::read_u32_into(chunk, &mut words);
            self.write_chunk(address + (i * max) as u64, chunk.len(), &words)?;
        }
        Ok(())
    }
}
