//! link logger
//! 
//! records the words moved across a link, for tracing and tests

use std::sync::mpsc;

use super::Event;

pub struct ChannelLogger {
    log: Vec<Event>,
    rx: mpsc::Receiver<Event>,
}

impl ChannelLogger {
    pub fn new_with(rx: mpsc::Receiver<Event>) -> Self {
        Self {
            log: Vec::new(),
            rx,
        }
    }

    /// events collected so far
    pub fn log(&self) -> &[Event] {
        &self.log
    }

    /// the words collected so far, in transfer order
    pub fn words(&self) -> Vec<u32> {
        self.log.iter()
            .map(|Event::Word { word, .. }| *word)
            .collect()
    }

    /// move events emitted since the last call into the log
    pub fn collect_pending(&mut self) {
        self.log.extend(self.rx.try_iter());
    }

    /// collect pending events, returning them one per line
    pub fn display_pending(&mut self) -> String {
        let start = self.log.len();
        self.collect_pending();
        self.log[start..].iter()
            .map(|Event::Word { time, word }| format!("@{time}: {word:#010x}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
