//! host context
//! 
//! the handle a host program uses to talk to the target. every method
//! runs on the host context and may hand control to the target while it
//! waits for data

use std::mem;
use std::sync::mpsc;

use crate::command::{self, WORD_SIZE};
use crate::config::TsiConfig;
use crate::queue::Queues;
use crate::sched::HostMsg;
use crate::Error;

pub struct Host {
    queues: Queues,
    config: TsiConfig,
    to_target: mpsc::Sender<HostMsg>,
    from_target: mpsc::Receiver<Queues>,
}

impl Host {
    pub(crate) fn new_with(
        queues: Queues,
        config: TsiConfig,
        to_target: mpsc::Sender<HostMsg>,
        from_target: mpsc::Receiver<Queues>,
    ) -> Self {
        Self { queues, config, to_target, from_target }
    }

    pub fn config(&self) -> &TsiConfig {
        &self.config
    }

    pub fn queues(&self) -> &Queues {
        &self.queues
    }

    /// hand control to the target and block until it hands it back
    pub fn yield_to_target(&mut self) -> Result<(), Error> {
        self.switch_to_target()
    }

    fn switch_to_target(&mut self) -> Result<(), Error> {
        let queues = mem::take(&mut self.queues);
        self.to_target.send(HostMsg::Yield(queues)).map_err(|_| Error::TargetGone)?;
        self.queues = self.from_target.recv().map_err(|_| Error::TargetGone)?;
        Ok(())
    }

    /// read `nbytes` from target memory at `address`
    /// 
    /// blocks, yielding to the target, until every word has arrived
    pub fn read_chunk(&mut self, address: u64, nbytes: usize) -> Result<Vec<u32>, Error> {
        self.queues.encode_read(address, nbytes)?;
        self.read_result(nbytes)
    }

    /// collect the `nbytes` response to a read that was already queued
    pub fn read_result(&mut self, nbytes: usize) -> Result<Vec<u32>, Error> {
        if nbytes % WORD_SIZE != 0 {
            return Err(Error::UnalignedSize(nbytes, WORD_SIZE));
        }
        let len = nbytes / WORD_SIZE;
        let mut result = Vec::with_capacity(len);
        while result.len() < len {
            match self.queues.pop_inbound() {
                Some(word) => result.push(word),
                None => self.switch_to_target()?,
            }
        }
        Ok(result)
    }

    /// write `data` to target memory at `address`
    /// 
    /// the words are only queued, they reach the target once the
    /// target context drains the outbound queue
    pub fn write_chunk(&mut self, address: u64, nbytes: usize, data: &[u32]) -> Result<(), Error> {
        self.queues.encode_write(address, nbytes, data)
    }

    /// queue a pre-built command
    pub fn send(&mut self, command: &command::Command) {
        self.queues.encode(command)
    }

    pub(crate) fn finish(mut self, result: anyhow::Result<()>) {
        let queues = mem::take(&mut self.queues);
        // nobody left to tell if the target side is gone
        let _ = self.to_target.send(HostMsg::Done(queues, result));
    }
}
