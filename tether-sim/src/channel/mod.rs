//! channel module
//! 
//! implements the word channel that moves 32-bit words between
//! two endpoints using a valid/ready handshake

use std::sync::mpsc;

use bitflags::bitflags;

use crate::Time;
use crate::{WordSink, WordSource};

pub mod logger;
pub use logger::ChannelLogger;

bitflags! {
    /// handshake signals observed on a link during one step
    #[derive(Clone, Copy, Hash, PartialEq, Eq, Debug)]
    pub struct Signals: u8 {
        const VALID = 0b001;    // producer has a word
        const READY = 0b010;    // consumer can take a word
        const FIRE  = 0b100;    // a word moved this step
    }
}

/// events emitted to loggers attached to a link
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Event {
    /// a word transferred at the given time
    Word { time: Time, word: u32 },
}

/// a one-directional word link between a producer and a consumer
/// 
/// a word is transferred only when the producer is valid and the
/// consumer is ready in the same step. at most one word moves per step
pub struct Link {
    name: String,
    transferred: usize,
    receivers: Vec<mpsc::Sender<Event>>,
}

impl Link {
    /// create a new link, the name is only used for diagnostics
    pub fn new_with(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transferred: 0,
            receivers: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// number of words moved across this link so far
    pub fn transferred(&self) -> usize {
        self.transferred
    }

    /// create a channel logger
    pub fn get_logger(&mut self) -> ChannelLogger {
        ChannelLogger::new_with(self.receiver())
    }

    /// add a receiver by registering a mspc::Sender
    /// and returning a mpsc::Receiver
    pub fn receiver(&mut self) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel();
        self.receivers.push(tx);
        rx
    }

    /// perform one handshake step between `source` and `sink`
    pub fn step<S, K>(&mut self, time: Time, source: &mut S, sink: &mut K) -> Signals
    where
        S: WordSource + ?Sized,
        K: WordSink + ?Sized,
    {
        let mut signals = Signals::empty();
        signals.set(Signals::VALID, source.valid());
        signals.set(Signals::READY, sink.ready());

        if signals.contains(Signals::VALID | Signals::READY) {
            let word = source.bits();
            source.fire();
            sink.accept(word);
            self.transferred += 1;
            signals.insert(Signals::FIRE);
            log::trace!("{} @ {}: {:#010x}", self.name, time, word);
            self.emit(Event::Word { time, word });
        }
        signals
    }

    /// emit an event to all receivers, detaching any that were dropped
    fn emit(&mut self, event: Event) {
        let attached = self.receivers.len();
        self.receivers.retain(|tx| tx.send(event).is_ok());
        if self.receivers.len() != attached {
            log::debug!("{}: detached {} dropped logger(s)", self.name, attached - self.receivers.len());
        }
    }

    /// number of loggers currently attached
    pub fn loggers(&self) -> usize {
        self.receivers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct Fifo {
        words: VecDeque<u32>,
        ready: bool,
    }

    impl WordSource for Fifo {
        fn valid(&self) -> bool { !self.words.is_empty() }
        fn bits(&self) -> u32 { self.words.front().copied().unwrap_or_default() }
        fn fire(&mut self) { self.words.pop_front(); }
    }

    impl WordSink for Fifo {
        fn ready(&self) -> bool { self.ready }
        fn accept(&mut self, word: u32) { self.words.push_back(word) }
    }

    #[test]
    fn test_link_requires_both_sides() {
        let mut link = Link::new_with("test");
        let mut src = Fifo::default();
        let mut dst = Fifo::default();

        // nothing valid, sink not ready
        let signals = link.step(0, &mut src, &mut dst);
        assert_eq!(signals, Signals::empty());

        // valid but not ready
        src.words.push_back(0xdeadbeef);
        let signals = link.step(1, &mut src, &mut dst);
        assert_eq!(signals, Signals::VALID);
        assert_eq!(src.words.len(), 1);
        assert!(dst.words.is_empty());

        // valid and ready
        dst.ready = true;
        let signals = link.step(2, &mut src, &mut dst);
        assert_eq!(signals, Signals::all());
        assert!(src.words.is_empty());
        assert_eq!(dst.words, [0xdeadbeef]);
        assert_eq!(link.transferred(), 1);
    }

    #[test]
    fn test_link_logger() {
        let mut link = Link::new_with("test");
        let mut logger = link.get_logger();
        let mut src = Fifo { words: VecDeque::from([1, 2]), ready: false };
        let mut dst = Fifo { words: VecDeque::new(), ready: true };

        for t in 0..4 {
            link.step(t, &mut src, &mut dst);
        }
        assert_eq!(logger.display_pending(), "@0: 0x00000001\n@1: 0x00000002");
        assert_eq!(logger.words(), [1, 2]);
        assert_eq!(logger.log(), &[
            Event::Word { time: 0, word: 1 },
            Event::Word { time: 1, word: 2 },
        ]);
    }

    #[test]
    fn test_dropped_logger_is_detached() {
        let mut link = Link::new_with("test");
        let mut kept = link.get_logger();
        drop(link.get_logger());
        assert_eq!(link.loggers(), 2);

        let mut src = Fifo { words: VecDeque::from([7, 8]), ready: false };
        let mut dst = Fifo { words: VecDeque::new(), ready: true };
        assert_eq!(link.step(0, &mut src, &mut dst), Signals::all());
        assert_eq!(link.loggers(), 1);
        assert_eq!(link.step(1, &mut src, &mut dst), Signals::all());

        assert_eq!(dst.words, [7, 8]);
        assert_eq!(link.transferred(), 2);
        kept.collect_pending();
        assert_eq!(kept.words(), [7, 8]);
    }
}
