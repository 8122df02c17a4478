#![forbid(unsafe_code)]

//! Dedicated render thread.
//!
//! [`RenderThread`] moves a [`Dispatcher`] onto its own thread and ticks it
//! at `tick_interval`. The producer keeps mutating the [`SharedSurface`]
//! from its own thread; the render thread is the only place backend calls
//! happen.
//!
//! # Commands
//!
//! Targets are added, removed and replaced through [`RenderCmd`] messages so
//! the dispatcher never needs a lock. A full command queue blocks the
//! sender (`send`) or fails fast (`try_send`).
//!
//! # Events
//!
//! Every [`DispatchEvent`] produced by a tick is forwarded on a bounded
//! channel polled with [`RenderThread::try_event`]. Events are dropped when
//! nobody drains the channel.
//!
//! # Shutdown
//!
//! [`RenderThread::shutdown`] runs one last tick, stops the thread and
//! returns the dispatcher. Dropping the handle does the same and discards
//! it.
//!
//! [`SharedSurface`]: crate::SharedSurface

use std::fmt;
use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::dispatcher::{DispatchEvent, Dispatcher, DynEngine, TargetId};

/// Channel capacity for the command queue.
const CHANNEL_CAPACITY: usize = 64;

/// Channel capacity for outbound events.
const EVENT_CAPACITY: usize = 256;

/// Messages sent to the render thread.
pub enum RenderCmd {
    /// Tick immediately instead of waiting for the interval.
    RenderNow,
    AddTarget {
        engine: DynEngine,
        reply: mpsc::SyncSender<TargetId>,
    },
    RemoveTarget(TargetId),
    ReplaceEngine(TargetId, DynEngine),
    Shutdown,
}

impl fmt::Debug for RenderCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RenderNow => f.write_str("RenderNow"),
            Self::AddTarget { engine, .. } => f.debug_tuple("AddTarget").field(&engine.name()).finish(),
            Self::RemoveTarget(id) => f.debug_tuple("RemoveTarget").field(id).finish(),
            Self::ReplaceEngine(id, engine) => f
                .debug_tuple("ReplaceEngine")
                .field(id)
                .field(&engine.name())
                .finish(),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

pub struct RenderThread {
    sender: mpsc::SyncSender<RenderCmd>,
    handle: Option<JoinHandle<Dispatcher>>,
    event_rx: mpsc::Receiver<DispatchEvent>,
}

impl RenderThread {
    /// Spawn the thread named by the dispatcher's config.
    pub fn start(dispatcher: Dispatcher) -> io::Result<Self> {
        let (tx, rx) = mpsc::sync_channel::<RenderCmd>(CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::sync_channel::<DispatchEvent>(EVENT_CAPACITY);
        let name = dispatcher.config().thread_name.clone();
        let interval = dispatcher.config().tick_interval;

        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || render_loop(dispatcher, rx, event_tx, interval))?;

        Ok(Self {
            sender: tx,
            handle: Some(handle),
            event_rx,
        })
    }

    pub fn send(&self, cmd: RenderCmd) -> Result<(), mpsc::SendError<RenderCmd>> {
        self.sender.send(cmd)
    }

    pub fn try_send(&self, cmd: RenderCmd) -> Result<(), mpsc::TrySendError<RenderCmd>> {
        self.sender.try_send(cmd)
    }

    /// Request an immediate tick. Returns `false` if the thread is gone.
    pub fn render_now(&self) -> bool {
        self.sender.send(RenderCmd::RenderNow).is_ok()
    }

    /// Add a target on the render thread and wait for its id.
    pub fn add_target<E: crate::RenderEngine + 'static>(&self, engine: E) -> Option<TargetId> {
        let (reply, reply_rx) = mpsc::sync_channel(1);
        self.sender
            .send(RenderCmd::AddTarget {
                engine: Box::new(engine),
                reply,
            })
            .ok()?;
        reply_rx.recv().ok()
    }

    pub fn remove_target(&self, id: TargetId) -> bool {
        self.sender.send(RenderCmd::RemoveTarget(id)).is_ok()
    }

    pub fn replace_engine<E: crate::RenderEngine + 'static>(&self, id: TargetId, engine: E) -> bool {
        self.sender
            .send(RenderCmd::ReplaceEngine(id, Box::new(engine)))
            .is_ok()
    }

    /// Next forwarded event, if any.
    pub fn try_event(&self) -> Option<DispatchEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<DispatchEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the thread after a final tick and return the dispatcher.
    /// Returns `None` if the thread panicked.
    pub fn shutdown(mut self) -> Option<Dispatcher> {
        let _ = self.sender.send(RenderCmd::Shutdown);
        self.handle.take()?.join().ok()
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        let _ = self.sender.send(RenderCmd::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl fmt::Debug for RenderThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderThread")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

fn render_loop(
    mut dispatcher: Dispatcher,
    rx: mpsc::Receiver<RenderCmd>,
    events: mpsc::SyncSender<DispatchEvent>,
    interval: Duration,
) -> Dispatcher {
    debug!(?interval, "render thread started");
    let mut next_tick = Instant::now() + interval;
    loop {
        let timeout = next_tick.saturating_duration_since(Instant::now());
        match rx.recv_timeout(timeout) {
            Ok(RenderCmd::Shutdown) => {
                tick(&mut dispatcher, &events);
                break;
            }
            Ok(cmd) => apply(&mut dispatcher, cmd, &events),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        // Checked after every command so a busy queue cannot starve ticks.
        let now = Instant::now();
        if now >= next_tick {
            tick(&mut dispatcher, &events);
            next_tick += interval;
            if next_tick <= now {
                next_tick = now + interval;
            }
        }
    }
    debug!(ticks = dispatcher.ticks(), "render thread stopped");
    dispatcher
}

fn apply(dispatcher: &mut Dispatcher, cmd: RenderCmd, events: &mpsc::SyncSender<DispatchEvent>) {
    match cmd {
        RenderCmd::RenderNow => tick(dispatcher, events),
        RenderCmd::AddTarget { engine, reply } => {
            let id = dispatcher.add_boxed_target(engine);
            let _ = reply.send(id);
        }
        RenderCmd::RemoveTarget(id) => {
            dispatcher.remove_target(id);
        }
        RenderCmd::ReplaceEngine(id, engine) => {
            dispatcher.replace_boxed_engine(id, engine);
        }
        RenderCmd::Shutdown => {}
    }
}

fn tick(dispatcher: &mut Dispatcher, events: &mpsc::SyncSender<DispatchEvent>) {
    for event in dispatcher.tick() {
        if events.try_send(event).is_err() {
            trace!("event queue full, dropping dispatch event");
        }
    }
}
