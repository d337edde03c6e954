//! host queues
//! 
//! the two FIFOs shared between the host and target contexts. whichever
//! context owns the `Queues` value is the one currently running

use std::collections::VecDeque;

use tether_sim::{WordSink, WordSource};

use crate::command::Command;
use crate::Error;

#[derive(Clone, Default, Debug)]
pub struct Queues {
    /// words waiting to be sent to the target
    outbound: VecDeque<u32>,
    /// words received from the target
    inbound: VecDeque<u32>,
}

impl Queues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outbound(&self) -> &VecDeque<u32> {
        &self.outbound
    }

    pub fn inbound(&self) -> &VecDeque<u32> {
        &self.inbound
    }

    /// true if neither queue holds a word
    pub fn is_drained(&self) -> bool {
        self.outbound.is_empty() && self.inbound.is_empty()
    }

    /// append a command's encoding to the outbound queue
    pub fn encode(&mut self, command: &Command) {
        log::debug!("encode {:?} {:#x} ({} words)",
            command.opcode(), command.address(), command.words());
        command.encode_into(&mut self.outbound);
    }

    /// queue a read of `nbytes` at `address`
    pub fn encode_read(&mut self, address: u64, nbytes: usize) -> Result<(), Error> {
        let command = Command::read(address, nbytes)?;
        self.encode(&command);
        Ok(())
    }

    /// queue a write of `nbytes` at `address`
    pub fn encode_write(&mut self, address: u64, nbytes: usize, data: &[u32]) -> Result<(), Error> {
        let command = Command::write(address, nbytes, data)?;
        self.encode(&command);
        Ok(())
    }

    /// hand the next outbound word to the channel, if any
    pub fn offer_outbound_word(&mut self) -> Option<u32> {
        self.outbound.pop_front()
    }

    /// take a word the channel received from the target
    pub fn accept_inbound_word(&mut self, word: u32) {
        self.inbound.push_back(word);
    }

    /// pop the oldest word received from the target
    pub fn pop_inbound(&mut self) -> Option<u32> {
        self.inbound.pop_front()
    }
}

// outbound side, as seen by the host-to-target link
impl WordSource for Queues {
    fn valid(&self) -> bool {
        !self.outbound.is_empty()
    }

    fn bits(&self) -> u32 {
        self.outbound.front().copied().unwrap_or_default()
    }

    fn fire(&mut self) {
        self.outbound.pop_front();
    }
}

// inbound side, the host is always ready
impl WordSink for Queues {
    fn ready(&self) -> bool {
        true
    }

    fn accept(&mut self, word: u32) {
        self.accept_inbound_word(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_request_leaves_queue_untouched() {
        let mut queues = Queues::new();
        assert!(queues.encode_read(0x1000, 3).is_err());
        assert!(queues.encode_write(0x1000, 8, &[1, 2, 3]).is_err());
        assert!(queues.is_drained());
    }

    #[test]
    fn test_offer_and_accept_are_fifo() {
        let mut queues = Queues::new();
        queues.encode_write(0x20, 4, &[0x55]).unwrap();
        let sent: Vec<u32> = std::iter::from_fn(|| queues.offer_outbound_word()).collect();
        assert_eq!(sent, [1, 0x20, 0, 0, 0, 0x55]);

        queues.accept_inbound_word(3);
        queues.accept_inbound_word(4);
        assert_eq!(queues.pop_inbound(), Some(3));
        assert_eq!(queues.pop_inbound(), Some(4));
        assert_eq!(queues.pop_inbound(), None);
    }
}
