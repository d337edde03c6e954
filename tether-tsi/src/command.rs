//! command codec
//! 
//! wire format of the commands sent to the target. every command starts
//! with an opcode word followed by the address and length chunks, a write
//! carries its payload right after the header:
//! 
//! ```text
//! READ  : [OPCODE_READ ][addr_0][addr_1][len_0][len_1]
//! WRITE : [OPCODE_WRITE][addr_0][addr_1][len_0][len_1][payload_0 .. payload_{N-1}]
//! ```
//! 
//! chunks are 32 bits wide and sent least significant first. the length
//! field holds the number of words minus one. read responses carry no
//! framing at all, the requester knows how many words to expect.

use crate::Error;

/// size of a word on the wire, in bytes
pub const WORD_SIZE: usize = std::mem::size_of::<u32>();
/// width of a single address or length chunk
pub const CHUNK_BITS: u32 = 32;
/// number of chunks used to encode a target address
pub const ADDR_CHUNKS: usize = 2;
/// number of chunks used to encode a transfer length
pub const LEN_CHUNKS: usize = 2;
/// words in a command header (opcode, address and length)
pub const HEADER_WORDS: usize = 1 + ADDR_CHUNKS + LEN_CHUNKS;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u32)]
pub enum Opcode {
    Read = 0,
    Write = 1,
}

impl TryFrom<u32> for Opcode {
    type Error = Error;

    fn try_from(word: u32) -> Result<Self, Self::Error> {
        match word {
            0 => Ok(Self::Read),
            1 => Ok(Self::Write),
            _ => Err(Error::Opcode(word)),
        }
    }
}

impl From<Opcode> for u32 {
    fn from(op: Opcode) -> u32 {
        op as u32
    }
}

/// convert a byte count to a word count
/// 
/// the byte count must be a non-zero multiple of the word size
pub fn word_count(address: u64, nbytes: usize) -> Result<usize, Error> {
    if nbytes % WORD_SIZE != 0 {
        return Err(Error::UnalignedSize(nbytes, WORD_SIZE));
    }
    if nbytes == 0 {
        return Err(Error::EmptyTransfer(address));
    }
    Ok(nbytes / WORD_SIZE)
}

/// split a value into `count` chunks, least significant first
/// 
/// bits beyond `count * CHUNK_BITS` are dropped
pub fn chunks(value: u64, count: usize) -> impl Iterator<Item = u32> {
    (0..count).map(move |i| {
        let shift = i as u32 * CHUNK_BITS;
        value.checked_shr(shift).unwrap_or(0) as u32
    })
}

/// reassemble chunks emitted by [`chunks`]
pub fn join_chunks(chunks: &[u32]) -> u64 {
    chunks.iter()
        .enumerate()
        .fold(0u64, |value, (i, chunk)| {
            let shift = i as u32 * CHUNK_BITS;
            value | (*chunk as u64).checked_shl(shift).unwrap_or(0)
        })
}

/// a request for the target
/// 
/// use [`Command::read`] and [`Command::write`] to build one, a command
/// must always cover at least one word
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Command {
    Read { address: u64, words: usize },
    Write { address: u64, data: Vec<u32> },
}

impl Command {
    /// build a read of `nbytes` starting at `address`
    pub fn read(address: u64, nbytes: usize) -> Result<Self, Error> {
        let words = word_count(address, nbytes)?;
        Ok(Self::Read { address, words })
    }

    /// build a write of `nbytes` starting at `address`
    /// 
    /// `data` must hold exactly `nbytes / WORD_SIZE` words
    pub fn write(address: u64, nbytes: usize, data: &[u32]) -> Result<Self, Error> {
        let words = word_count(address, nbytes)?;
        if data.len() != words {
            return Err(Error::PayloadLength { expected: words, found: data.len() });
        }
        Ok(Self::Write { address, data: data.to_vec() })
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Read { .. } => Opcode::Read,
            Self::Write { .. } => Opcode::Write,
        }
    }

    pub fn address(&self) -> u64 {
        match self {
            Self::Read { address, .. } | Self::Write { address, .. } => *address,
        }
    }

    /// number of words transferred by this command
    pub fn words(&self) -> usize {
        match self {
            Self::Read { words, .. } => *words,
            Self::Write { data, .. } => data.len(),
        }
    }

    /// total number of words this command occupies on the wire
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Read { .. } => HEADER_WORDS,
            Self::Write { data, .. } => HEADER_WORDS + data.len(),
        }
    }

    /// append the wire encoding of this command to `out`
    pub fn encode_into<E: Extend<u32>>(&self, out: &mut E) {
        out.extend(std::iter::once(u32::from(self.opcode())));
        out.extend(chunks(self.address(), ADDR_CHUNKS));
        out.extend(chunks((self.words() as u64).saturating_sub(1), LEN_CHUNKS));
        if let Self::Write { data, .. } = self {
            out.extend(data.iter().copied());
        }
    }

    /// wire encoding of this command
    pub fn encode(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut out);
        out
    }
}

/// a decoded command header
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Header {
    pub opcode: Opcode,
    pub address: u64,
    pub words: usize,
}

/// output of the streaming [`Parser`]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Decoded {
    /// a complete header, a write header is followed by `words` payload words
    Header(Header),
    /// a single write payload word and the address it belongs at
    Payload { address: u64, word: u32 },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum ParseState {
    Opcode,
    Address(Opcode),
    Length(Opcode, u64),
    Payload { address: u64, remaining: usize },
}

/// streaming command parser, fed one word at a time
/// 
/// this is the receiving half of the codec, used by targets and by
/// anything that needs to inspect an outbound word stream
#[derive(Clone, Debug)]
pub struct Parser {
    state: ParseState,
    chunks: Vec<u32>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            state: ParseState::Opcode,
            chunks: Vec::with_capacity(ADDR_CHUNKS.max(LEN_CHUNKS)),
        }
    }

    /// true if the parser sits between commands
    pub fn is_idle(&self) -> bool {
        self.state == ParseState::Opcode
    }

    /// feed the next word of the stream
    /// 
    /// returns a decoded item once one is complete. an invalid opcode
    /// leaves the parser waiting for the next opcode word
    pub fn push(&mut self, word: u32) -> Result<Option<Decoded>, Error> {
        match self.state {
            ParseState::Opcode => {
                let opcode = Opcode::try_from(word)?;
                self.chunks.clear();
                self.state = ParseState::Address(opcode);
                Ok(None)
            }
            ParseState::Address(opcode) => {
                self.chunks.push(word);
                if self.chunks.len() == ADDR_CHUNKS {
                    let address = join_chunks(&self.chunks);
                    self.chunks.clear();
                    self.state = ParseState::Length(opcode, address);
                }
                Ok(None)
            }
            ParseState::Length(opcode, address) => {
                self.chunks.push(word);
                if self.chunks.len() < LEN_CHUNKS {
                    return Ok(None);
                }
                let words = usize::try_from(join_chunks(&self.chunks))
                    .unwrap_or(usize::MAX)
                    .saturating_add(1);
                self.chunks.clear();
                self.state = match opcode {
                    Opcode::Read => ParseState::Opcode,
                    Opcode::Write => ParseState::Payload { address, remaining: words },
                };
                Ok(Some(Decoded::Header(Header { opcode, address, words })))
            }
            ParseState::Payload { address, remaining } => {
                self.state = if remaining > 1 {
                    ParseState::Payload {
                        address: address.wrapping_add(WORD_SIZE as u64),
                        remaining: remaining - 1,
                    }
                } else {
                    ParseState::Opcode
                };
                Ok(Some(Decoded::Payload { address, word }))
            }
        }
    }

    /// parse a complete word stream back into commands
    pub fn parse_all(words: impl IntoIterator<Item = u32>) -> Result<Vec<Command>, Error> {
        let mut parser = Self::new();
        let mut commands = Vec::new();
        for word in words {
            match parser.push(word)? {
                Some(Decoded::Header(Header { opcode: Opcode::Read, address, words })) => {
                    commands.push(Command::Read { address, words });
                }
                Some(Decoded::Header(Header { opcode: Opcode::Write, address, words })) => {
                    commands.push(Command::Write { address, data: Vec::with_capacity(words) });
                }
                Some(Decoded::Payload { word, .. }) => {
                    if let Some(Command::Write { data, .. }) = commands.last_mut() {
                        data.push(word);
                    }
                }
                None => (),
            }
        }
        Ok(commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_encoding() {
        let cmd = Command::write(0x1000, 8, &[0xAAAAAAAA, 0xBBBBBBBB])
            .expect("failed to build write");
        assert_eq!(cmd.encode(), vec![
            1,
            0x1000, 0,
            1, 0,
            0xAAAAAAAA, 0xBBBBBBBB,
        ]);
    }

    #[test]
    fn test_read_encoding() {
        let cmd = Command::read(0x1_2345_6780, 4).expect("failed to build read");
        assert_eq!(cmd.encode(), vec![0, 0x2345_6780, 0x1, 0, 0]);
        assert_eq!(cmd.encoded_len(), HEADER_WORDS);
    }

    #[test]
    fn test_malformed_requests() {
        assert!(matches!(Command::read(0, 6), Err(Error::UnalignedSize(6, 4))));
        assert!(matches!(Command::read(0x40, 0), Err(Error::EmptyTransfer(0x40))));
        assert!(matches!(
            Command::write(0, 8, &[1]),
            Err(Error::PayloadLength { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_chunks_edge_values() {
        for value in [0u64, 1, u32::MAX as u64, 1 << 32, u64::MAX] {
            let parts: Vec<u32> = chunks(value, ADDR_CHUNKS).collect();
            assert_eq!(join_chunks(&parts), value);
        }
        let parts: Vec<u32> = chunks(0xdead_beef_0bad_f00d, 2).collect();
        assert_eq!(parts, [0x0bad_f00d, 0xdead_beef]);
    }

    #[test]
    fn test_parser_stream() {
        let mut words = Command::write(0x80, 8, &[7, 8]).unwrap().encode();
        Command::read(0x80, 8).unwrap().encode_into(&mut words);

        let mut parser = Parser::new();
        let decoded: Vec<Decoded> = words.into_iter()
            .filter_map(|w| parser.push(w).expect("failed to parse"))
            .collect();

        assert_eq!(decoded, vec![
            Decoded::Header(Header { opcode: Opcode::Write, address: 0x80, words: 2 }),
            Decoded::Payload { address: 0x80, word: 7 },
            Decoded::Payload { address: 0x84, word: 8 },
            Decoded::Header(Header { opcode: Opcode::Read, address: 0x80, words: 2 }),
        ]);
        assert!(parser.is_idle());
    }

    #[test]
    fn test_parser_bad_opcode() {
        let mut parser = Parser::new();
        assert!(matches!(parser.push(7), Err(Error::Opcode(7))));
        assert!(parser.is_idle());
    }

    #[test]
    fn test_parser_length_saturates() {
        let mut parser = Parser::new();
        let header = [0, 0x40, 0, u32::MAX, u32::MAX]
            .into_iter()
            .filter_map(|w| parser.push(w).expect("failed to parse"))
            .collect::<Vec<_>>();
        assert_eq!(header, vec![
            Decoded::Header(Header { opcode: Opcode::Read, address: 0x40, words: usize::MAX }),
        ]);
        assert!(parser.is_idle());
    }
}
