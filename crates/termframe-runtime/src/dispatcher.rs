#![forbid(unsafe_code)]

//! Fan-out of one shared surface to several render targets.
//!
//! The [`Dispatcher`] owns every [`RenderTarget`] attached to a surface and
//! runs one frame per target on each [`tick`](Dispatcher::tick). Targets are
//! independent: a failing backend never blocks the others.
//!
//! # Unhealthy engines
//!
//! A target whose present fails `max_consecutive_present_failures` times in
//! a row is reported as [`DispatchEvent::EngineUnhealthy`]. If the target was
//! added with an [`EngineFactory`], the factory builds a replacement which
//! starts fully dirty and re-commits the current title.

use std::fmt;

use termframe_core::{EngineCaps, GridSize, SurfaceSource};
use termframe_render::{EngineError, FrameOutcome, RenderEngine};
use tracing::{debug, info_span, warn};

use crate::config::RuntimeConfig;
use crate::surface::SharedSurface;
use crate::target::RenderTarget;

/// Boxed engine as stored by the dispatcher.
pub type DynEngine = Box<dyn RenderEngine>;

/// Stable handle to a target within one dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target#{}", self.0)
    }
}

/// Builds replacement engines for an unhealthy target.
pub trait EngineFactory: Send {
    fn create(&mut self, size: GridSize) -> Result<DynEngine, EngineError>;
}

impl<F> EngineFactory for F
where
    F: FnMut(GridSize) -> Result<DynEngine, EngineError> + Send,
{
    fn create(&mut self, size: GridSize) -> Result<DynEngine, EngineError> {
        self(size)
    }
}

/// Something noteworthy that happened during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    /// Presented, but some regions or the title must be retried.
    FrameDegraded {
        target: TargetId,
        failed_regions: usize,
        title_failed: bool,
    },
    /// Present failed; the target is fully dirty again.
    PresentFailed { target: TargetId, consecutive: u32 },
    /// The failure threshold was reached.
    EngineUnhealthy { target: TargetId, consecutive: u32 },
    /// A factory replaced the target's engine.
    EngineReplaced { target: TargetId, engine: String },
    /// The factory could not build a replacement. Retried next tick.
    ReplacementFailed { target: TargetId, reason: String },
}

impl DispatchEvent {
    #[must_use]
    pub fn target(&self) -> TargetId {
        match self {
            Self::FrameDegraded { target, .. }
            | Self::PresentFailed { target, .. }
            | Self::EngineUnhealthy { target, .. }
            | Self::EngineReplaced { target, .. }
            | Self::ReplacementFailed { target, .. } => *target,
        }
    }
}

struct Slot {
    id: TargetId,
    target: RenderTarget<DynEngine>,
    factory: Option<Box<dyn EngineFactory>>,
}

/// Owns the render targets of one shared surface.
pub struct Dispatcher {
    surface: SharedSurface,
    config: RuntimeConfig,
    slots: Vec<Slot>,
    next_id: u64,
    ticks: u64,
}

impl Dispatcher {
    #[must_use]
    pub fn new(surface: SharedSurface, config: RuntimeConfig) -> Self {
        Self {
            surface,
            config,
            slots: Vec::new(),
            next_id: 0,
            ticks: 0,
        }
    }

    #[must_use]
    pub fn surface(&self) -> &SharedSurface {
        &self.surface
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn add_target<E: RenderEngine + 'static>(&mut self, engine: E) -> TargetId {
        self.insert(Box::new(engine), None)
    }

    /// [`add_target`](Self::add_target) for an already boxed engine.
    pub fn add_boxed_target(&mut self, engine: DynEngine) -> TargetId {
        self.insert(engine, None)
    }

    /// Add a target whose engine is rebuilt by `factory` once unhealthy.
    pub fn add_target_with_factory<E, F>(&mut self, engine: E, factory: F) -> TargetId
    where
        E: RenderEngine + 'static,
        F: EngineFactory + 'static,
    {
        self.insert(Box::new(engine), Some(Box::new(factory)))
    }

    fn insert(&mut self, engine: DynEngine, factory: Option<Box<dyn EngineFactory>>) -> TargetId {
        let id = TargetId(self.next_id);
        self.next_id += 1;
        let target = RenderTarget::new(engine, &self.surface, &self.config);
        debug!(%id, engine = target.name(), "render target added");
        self.slots.push(Slot {
            id,
            target,
            factory,
        });
        id
    }

    /// Detach a target and hand back its engine.
    pub fn remove_target(&mut self, id: TargetId) -> Option<DynEngine> {
        let pos = self.slots.iter().position(|s| s.id == id)?;
        let slot = self.slots.remove(pos);
        debug!(%id, "render target removed");
        Some(slot.target.into_engine())
    }

    /// Swap the engine of `id`. Returns the previous engine.
    pub fn replace_engine<E: RenderEngine + 'static>(&mut self, id: TargetId, engine: E) -> Option<DynEngine> {
        self.replace_boxed_engine(id, Box::new(engine))
    }

    pub fn replace_boxed_engine(&mut self, id: TargetId, engine: DynEngine) -> Option<DynEngine> {
        let slot = self.slot_mut(id)?;
        Some(slot.target.replace_engine(engine))
    }

    #[must_use]
    pub fn capabilities(&self, id: TargetId) -> Option<EngineCaps> {
        self.slot(id).map(|s| s.target.report_capabilities())
    }

    #[must_use]
    pub fn target(&self, id: TargetId) -> Option<&RenderTarget<DynEngine>> {
        self.slot(id).map(|s| &s.target)
    }

    pub fn target_mut(&mut self, id: TargetId) -> Option<&mut RenderTarget<DynEngine>> {
        self.slot_mut(id).map(|s| &mut s.target)
    }

    #[must_use]
    pub fn target_ids(&self) -> Vec<TargetId> {
        self.slots.iter().map(|s| s.id).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Ticks run so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    fn slot(&self, id: TargetId) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id == id)
    }

    fn slot_mut(&mut self, id: TargetId) -> Option<&mut Slot> {
        self.slots.iter_mut().find(|s| s.id == id)
    }

    /// Run one frame on every target.
    pub fn tick(&mut self) -> Vec<DispatchEvent> {
        self.ticks += 1;
        let _span = info_span!("dispatch_tick", tick = self.ticks, targets = self.slots.len()).entered();
        let threshold = self.config.max_consecutive_present_failures;
        let size = self.surface.size();
        let mut events = Vec::new();

        for slot in &mut self.slots {
            let report = slot.target.run_frame();
            match report.outcome {
                FrameOutcome::Skipped | FrameOutcome::Presented => {}
                FrameOutcome::Degraded { failed_regions } => {
                    events.push(DispatchEvent::FrameDegraded {
                        target: slot.id,
                        failed_regions,
                        title_failed: report.paint.title_failed,
                    });
                }
                FrameOutcome::PresentFailed { consecutive } => {
                    warn!(target_id = %slot.id, engine = slot.target.name(), consecutive, "present failed");
                    events.push(DispatchEvent::PresentFailed {
                        target: slot.id,
                        consecutive,
                    });
                    if consecutive < threshold {
                        continue;
                    }
                    if consecutive == threshold {
                        warn!(target_id = %slot.id, consecutive, "render engine unhealthy");
                        events.push(DispatchEvent::EngineUnhealthy {
                            target: slot.id,
                            consecutive,
                        });
                    }
                    if let Some(factory) = slot.factory.as_mut() {
                        events.push(Self::rebuild(slot.id, &mut slot.target, &mut **factory, size));
                    }
                }
            }
        }
        events
    }

    fn rebuild(
        id: TargetId,
        target: &mut RenderTarget<DynEngine>,
        factory: &mut dyn EngineFactory,
        size: GridSize,
    ) -> DispatchEvent {
        match factory.create(size) {
            Ok(engine) => {
                target.replace_engine(engine);
                DispatchEvent::EngineReplaced {
                    target: id,
                    engine: target.name().to_owned(),
                }
            }
            Err(err) => {
                warn!(target_id = %id, error = %err, "replacement engine failed");
                DispatchEvent::ReplacementFailed {
                    target: id,
                    reason: err.to_string(),
                }
            }
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("targets", &self.target_ids())
            .field("ticks", &self.ticks)
            .field("config", &self.config)
            .finish()
    }
}
