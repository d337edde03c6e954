//! cooperative scheduler
//! 
//! the host program and the target share one logical timeline. the host
//! program runs on its own thread but only while it holds the queues,
//! which are passed back and forth over a pair of channels. the side
//! without the queues is blocked, so exactly one side runs at a time and
//! every switch is a synchronous hand-off.

use std::any::Any;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use anyhow::anyhow;
use tether_sim::{self as sim, Clocked, WordSink, WordSource};

use crate::config::TsiConfig;
use crate::queue::Queues;
use crate::{Error, Host};

/// messages from the host context back to the target context
pub(crate) enum HostMsg {
    /// the host is waiting for the target
    Yield(Queues),
    /// the host program returned
    Done(Queues, anyhow::Result<()>),
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum HostState {
    /// the host context holds control
    Running,
    /// the host yielded and waits to be resumed
    Suspended,
    /// the host program returned, resuming it is a no-op
    Finished,
    /// the host program failed or its context was lost
    Failed,
}

/// target side of the tethered serial interface
/// 
/// owns the queues whenever the target context runs, and exposes them
/// to the word channel. host programs are expected to propagate
/// `Error::TargetGone`, once the interface is dropped every yield fails
pub struct Tsi {
    queues: Queues,
    config: TsiConfig,
    state: HostState,
    switches: usize,
    to_host: Option<mpsc::Sender<Queues>>,
    from_host: mpsc::Receiver<HostMsg>,
    thread: Option<JoinHandle<()>>,
}

impl Tsi {
    /// create an interface running `program` with the default configuration
    pub fn new<F>(program: F) -> Result<Self, Error>
    where
        F: FnOnce(&mut Host) -> anyhow::Result<()> + Send + 'static,
    {
        Self::new_with(TsiConfig::default(), program)
    }

    /// create an interface running `program` as the host context
    /// 
    /// the host runs first: this returns once the program yields to the
    /// target for the first time, or returns. an invalid `config` is
    /// rejected before the host context is created
    pub fn new_with<F>(config: TsiConfig, program: F) -> Result<Self, Error>
    where
        F: FnOnce(&mut Host) -> anyhow::Result<()> + Send + 'static,
    {
        config.validate()?;

        let (to_host, host_rx) = mpsc::channel::<Queues>();
        let (host_tx, from_host) = mpsc::channel::<HostMsg>();

        let thread = thread::Builder::new()
            .name(String::from("tsi-host"))
            .spawn(move || {
                let Ok(queues) = host_rx.recv() else {
                    return;
                };
                let mut host = Host::new_with(queues, config, host_tx, host_rx);
                let result = panic::catch_unwind(AssertUnwindSafe(|| program(&mut host)))
                    .unwrap_or_else(|payload| {
                        Err(anyhow!("host program panicked: {}", panic_message(&*payload)))
                    });
                host.finish(result);
            })
            .map_err(Error::Spawn)?;

        let mut tsi = Self {
            queues: Queues::new(),
            config,
            state: HostState::Suspended,
            switches: 0,
            to_host: Some(to_host),
            from_host,
            thread: Some(thread),
        };
        tsi.switch_to_host()?;
        Ok(tsi)
    }

    pub fn config(&self) -> &TsiConfig {
        &self.config
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    /// number of times control was handed to the host
    pub fn switches(&self) -> usize {
        self.switches
    }

    pub fn queues(&self) -> &Queues {
        &self.queues
    }

    /// true once the host program returned successfully
    pub fn host_finished(&self) -> bool {
        self.state == HostState::Finished
    }

    /// hand control to the host until it yields back
    /// 
    /// after the host program finished this returns immediately
    pub fn switch_to_host(&mut self) -> Result<(), Error> {
        match self.state {
            HostState::Finished => return Ok(()),
            HostState::Failed => return Err(Error::HostGone),
            HostState::Running | HostState::Suspended => (),
        }
        let Some(to_host) = self.to_host.as_ref() else {
            self.state = HostState::Failed;
            return Err(Error::HostGone);
        };

        self.switches += 1;
        self.state = HostState::Running;
        log::debug!("switch to host ({})", self.switches);

        if let Err(mpsc::SendError(queues)) = to_host.send(mem::take(&mut self.queues)) {
            self.queues = queues;
            self.state = HostState::Failed;
            self.join();
            return Err(Error::HostGone);
        }

        match self.from_host.recv() {
            Ok(HostMsg::Yield(queues)) => {
                self.queues = queues;
                self.state = HostState::Suspended;
                Ok(())
            }
            Ok(HostMsg::Done(queues, result)) => {
                self.queues = queues;
                self.join();
                match result {
                    Ok(()) => {
                        log::info!("host program finished after {} switches", self.switches);
                        self.state = HostState::Finished;
                        Ok(())
                    }
                    Err(err) => {
                        log::warn!("host program failed: {err}");
                        self.state = HostState::Failed;
                        Err(Error::Host(err))
                    }
                }
            }
            Err(_) => {
                self.state = HostState::Failed;
                self.join();
                Err(Error::HostGone)
            }
        }
    }

    /// give the channel the next word bound for the target, if any
    pub fn offer_outbound_word(&mut self) -> Option<u32> {
        self.queues.offer_outbound_word()
    }

    /// store a word the channel received from the target
    pub fn accept_inbound_word(&mut self, word: u32) {
        self.queues.accept_inbound_word(word)
    }

    /// one handshake step on the target-facing wires
    /// 
    /// a word offered by the target is always accepted. returns the word
    /// delivered to the target this step, if the target was ready
    pub fn tick(&mut self, target_valid: bool, target_bits: u32, target_ready: bool) -> Option<u32> {
        if target_valid && self.queues.ready() {
            self.accept_inbound_word(target_bits);
        }
        if target_ready {
            self.offer_outbound_word()
        } else {
            None
        }
    }

    fn join(&mut self) {
        self.to_host.take();
        if let Some(thread) = self.thread.take() {
            // panics are caught inside the host thread
            let _ = thread.join();
        }
    }
}

impl Drop for Tsi {
    fn drop(&mut self) {
        // a suspended host sees the closed channel and unwinds with TargetGone.
        // its thread is detached rather than joined, a program that keeps
        // yielding after TargetGone must not block the target side
        self.to_host.take();
        if self.thread.take().is_some() {
            log::debug!("detached host context in state {:?}", self.state);
        }
    }
}

impl Clocked for Tsi {
    fn step(&mut self) -> Result<(), sim::Error> {
        self.switch_to_host().map_err(sim::Error::clocked)
    }
}

impl WordSource for Tsi {
    fn valid(&self) -> bool {
        self.queues.valid()
    }

    fn bits(&self) -> u32 {
        self.queues.bits()
    }

    fn fire(&mut self) {
        self.queues.fire()
    }
}

impl WordSink for Tsi {
    fn ready(&self) -> bool {
        self.queues.ready()
    }

    fn accept(&mut self, word: u32) {
        self.queues.accept(word)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}
