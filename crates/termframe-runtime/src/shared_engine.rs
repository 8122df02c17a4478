#![forbid(unsafe_code)]

//! Engine shared with an observer.
//!
//! Once an engine is boxed into a [`Dispatcher`](crate::Dispatcher) or moved
//! onto the render thread it can no longer be inspected. [`SharedEngine`]
//! keeps a second handle: the dispatcher drives one clone while the other
//! reads the engine's state, e.g. a headless diagnostics mirror queried
//! from the application thread.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use termframe_core::{CellRect, EngineCaps, GridSize, RegionContent};
use termframe_render::{EngineError, RenderEngine};

#[derive(Debug)]
pub struct SharedEngine<E> {
    inner: Arc<Mutex<E>>,
    name: String,
}

impl<E> Clone for SharedEngine<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            name: self.name.clone(),
        }
    }
}

impl<E: RenderEngine> SharedEngine<E> {
    #[must_use]
    pub fn new(engine: E) -> Self {
        let name = engine.name().to_owned();
        Self {
            inner: Arc::new(Mutex::new(engine)),
            name,
        }
    }

    /// Lock the engine. Blocks while the render thread is inside a backend
    /// call.
    pub fn lock(&self) -> MutexGuard<'_, E> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: RenderEngine> RenderEngine for SharedEngine<E> {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> EngineCaps {
        self.lock().capabilities()
    }

    fn invalidate(&mut self, rect: CellRect) -> Result<(), EngineError> {
        self.lock().invalidate(rect)
    }

    fn paint_region(&mut self, rect: CellRect, content: &RegionContent) -> Result<(), EngineError> {
        self.lock().paint_region(rect, content)
    }

    fn update_title(&mut self, title: &str) -> Result<(), EngineError> {
        self.lock().update_title(title)
    }

    fn present(&mut self) -> Result<(), EngineError> {
        self.lock().present()
    }

    fn resize(&mut self, size: GridSize) -> Result<(), EngineError> {
        self.lock().resize(size)
    }
}
