#![forbid(unsafe_code)]

//! One engine bound to a shared surface.
//!
//! A [`RenderTarget`] owns the engine base, the frame controller and the
//! tracker subscription for a single backend. Dropping the target
//! unsubscribes it from the surface.

use std::sync::Arc;

use termframe_core::{EngineCaps, GridSize, SurfaceSource};
use termframe_render::{
    EngineBase, FrameController, FrameReport, InvalidationTracker, PaintSummary, RenderEngine,
};
use tracing::info;

use crate::config::RuntimeConfig;
use crate::surface::{SharedSurface, SubscriptionId};

/// Surface subscription, released on drop.
#[derive(Debug)]
struct Subscription {
    surface: SharedSurface,
    id: SubscriptionId,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.surface.unsubscribe(self.id);
    }
}

pub struct RenderTarget<E: RenderEngine> {
    engine: EngineBase<E>,
    frames: FrameController,
    subscription: Subscription,
}

impl<E: RenderEngine> RenderTarget<E> {
    /// Bind `engine` to `surface`. The first frame repaints everything.
    pub fn new(engine: E, surface: &SharedSurface, config: &RuntimeConfig) -> Self {
        let tracker = Arc::new(InvalidationTracker::with_max_rects(
            surface.size(),
            config.max_dirty_rects,
        ));
        let engine = EngineBase::new(engine);
        let id = surface.subscribe(Arc::clone(&tracker), engine.title_proposer());
        let frames = FrameController::new(tracker).with_force_full_redraw(config.force_full_redraw);
        Self {
            engine,
            frames,
            subscription: Subscription {
                surface: surface.clone(),
                id,
            },
        }
    }

    pub fn begin_frame_if_needed(&mut self) -> bool {
        self.frames.begin_frame_if_needed(&self.engine)
    }

    pub fn paint(&mut self) -> PaintSummary {
        self.frames.paint(&mut self.engine, &self.subscription.surface)
    }

    pub fn end_frame(&mut self) -> FrameReport {
        self.frames.end_frame()
    }

    pub fn run_frame(&mut self) -> FrameReport {
        self.frames.run_frame(&mut self.engine, &self.subscription.surface)
    }

    /// Capabilities of the current backend.
    #[must_use]
    pub fn report_capabilities(&self) -> EngineCaps {
        self.engine.capabilities()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.engine.name()
    }

    /// Swap in a new backend. The new one is resized on the next frame,
    /// repaints the whole surface and receives the current title.
    pub fn replace_engine(&mut self, engine: E) -> E {
        self.frames.abort();
        let old = self.engine.replace_backend(engine);
        self.frames.reset_backend_state();
        info!(from = old.name(), to = self.engine.name(), "render engine replaced");
        old
    }

    #[must_use]
    pub fn engine(&self) -> &EngineBase<E> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut EngineBase<E> {
        &mut self.engine
    }

    #[must_use]
    pub fn tracker(&self) -> &Arc<InvalidationTracker> {
        self.frames.tracker()
    }

    #[must_use]
    pub fn frames(&self) -> &FrameController {
        &self.frames
    }

    #[must_use]
    pub fn surface_size(&self) -> GridSize {
        self.subscription.surface.size()
    }

    /// Unbind from the surface and return the backend.
    pub fn into_engine(mut self) -> E {
        self.frames.abort();
        let Self { engine, .. } = self;
        engine.into_backend()
    }
}

impl<E: RenderEngine> std::fmt::Debug for RenderTarget<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTarget")
            .field("engine", &self.engine.name())
            .field("state", &self.frames.state())
            .field("subscription", &self.subscription.id)
            .finish()
    }
}
