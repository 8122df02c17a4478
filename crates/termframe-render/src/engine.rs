#![forbid(unsafe_code)]

//! Render engine interface.
//!
//! Every drawing backend implements [`RenderEngine`]. The frame controller
//! only ever talks to this trait and checks [`RenderEngine::capabilities`]
//! before calling optional operations, so a backend that lacks a feature is
//! skipped up front instead of being asked and failing.

use std::fmt;
use std::io;

use termframe_core::{CellRect, EngineCaps, GridSize, RegionContent};

/// Errors reported by a render engine.
#[derive(Debug)]
pub enum EngineError {
    /// Drawing one region failed. The region stays dirty and is retried.
    Draw { rect: CellRect, reason: String },
    /// Drawing resources were lost and must be recreated.
    SurfaceLost(String),
    /// Output I/O failed.
    Io(io::Error),
    /// The engine does not support the named operation.
    Unsupported(&'static str),
}

impl EngineError {
    /// Region draw failure.
    pub fn draw(rect: CellRect, reason: impl Into<String>) -> Self {
        Self::Draw {
            rect,
            reason: reason.into(),
        }
    }

    /// Whether the engine's drawing resources must be rebuilt.
    #[must_use]
    pub fn is_surface_lost(&self) -> bool {
        matches!(self, Self::SurfaceLost(_))
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draw { rect, reason } => write!(f, "draw failed at {rect}: {reason}"),
            Self::SurfaceLost(reason) => write!(f, "drawing surface lost: {reason}"),
            Self::Io(err) => write!(f, "engine I/O error: {err}"),
            Self::Unsupported(op) => write!(f, "operation not supported: {op}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for EngineError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// A drawing backend.
///
/// All calls come from the render thread. `paint_region` must be idempotent:
/// painting the same content twice leaves the same visible result as
/// painting it once.
pub trait RenderEngine: Send {
    /// Short name for logs.
    fn name(&self) -> &str {
        "engine"
    }

    fn capabilities(&self) -> EngineCaps;

    /// Pre-paint notification for `rect`. Only called when the engine
    /// advertises [`EngineCaps::INVALIDATE`].
    fn invalidate(&mut self, _rect: CellRect) -> Result<(), EngineError> {
        Ok(())
    }

    /// Draw the cells of `rect` from `content`.
    fn paint_region(&mut self, rect: CellRect, content: &RegionContent) -> Result<(), EngineError>;

    /// Apply a window/tab title.
    fn update_title(&mut self, _title: &str) -> Result<(), EngineError> {
        Ok(())
    }

    /// Commit everything painted since the last present. On failure the
    /// engine's resources may be lost; it must recreate them before the next
    /// successful present.
    fn present(&mut self) -> Result<(), EngineError>;

    /// The surface changed size.
    fn resize(&mut self, _size: GridSize) -> Result<(), EngineError> {
        Ok(())
    }
}

impl<E: RenderEngine + ?Sized> RenderEngine for Box<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn capabilities(&self) -> EngineCaps {
        (**self).capabilities()
    }

    fn invalidate(&mut self, rect: CellRect) -> Result<(), EngineError> {
        (**self).invalidate(rect)
    }

    fn paint_region(&mut self, rect: CellRect, content: &RegionContent) -> Result<(), EngineError> {
        (**self).paint_region(rect, content)
    }

    fn update_title(&mut self, title: &str) -> Result<(), EngineError> {
        (**self).update_title(title)
    }

    fn present(&mut self) -> Result<(), EngineError> {
        (**self).present()
    }

    fn resize(&mut self, size: GridSize) -> Result<(), EngineError> {
        (**self).resize(size)
    }
}
