#![forbid(unsafe_code)]

//! Headless engine for tests and diagnostics mirrors.
//!
//! `HeadlessEngine` keeps two in-memory grids: the staged grid that
//! `paint_region` writes into and the presented grid that `present` copies
//! it to. Every backend call is recorded as a [`DrawCall`], and failures can
//! be injected per operation to exercise the frame controller's recovery.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use termframe_core::{GridSize, Style, Surface};
//! use termframe_render::backend::headless::HeadlessEngine;
//! use termframe_render::{EngineBase, FrameController, InvalidationTracker};
//!
//! let size = GridSize::new(20, 2);
//! let mut surface = Surface::new(size);
//! surface.write_text(0, 0, "Hello, world!", Style::default());
//!
//! let mut engine = EngineBase::new(HeadlessEngine::new(size));
//! let mut frames = FrameController::new(Arc::new(InvalidationTracker::new(size)));
//! frames.run_frame(&mut engine, &surface);
//!
//! assert_eq!(engine.backend().presented_text(0), "Hello, world!");
//! ```

use termframe_core::{Cell, CellRect, CursorState, EngineCaps, GridSize, RegionContent};

use crate::engine::{EngineError, RenderEngine};

/// A recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCall {
    Resize(GridSize),
    Invalidate(CellRect),
    Paint(CellRect),
    Title(String),
    Present,
}

#[derive(Debug, Clone)]
pub struct HeadlessEngine {
    size: GridSize,
    staged: Vec<Cell>,
    presented: Vec<Cell>,
    cursor: Option<CursorState>,
    title: String,
    calls: Vec<DrawCall>,
    frames_presented: u64,
    caps: EngineCaps,
    fail_paints: u32,
    fail_presents: u32,
    fail_titles: u32,
    fail_resizes: u32,
}

impl HeadlessEngine {
    #[must_use]
    pub fn new(size: GridSize) -> Self {
        Self {
            size,
            staged: vec![Cell::default(); size.area()],
            presented: vec![Cell::default(); size.area()],
            cursor: None,
            title: String::new(),
            calls: Vec::new(),
            frames_presented: 0,
            caps: EngineCaps::SURFACE | EngineCaps::INVALIDATE | EngineCaps::HEADLESS,
            fail_paints: 0,
            fail_presents: 0,
            fail_titles: 0,
            fail_resizes: 0,
        }
    }

    /// Override the advertised capabilities.
    #[must_use]
    pub fn with_capabilities(mut self, caps: EngineCaps) -> Self {
        self.caps = caps;
        self
    }

    /// Fail the next `n` paint (and invalidate) calls.
    pub fn fail_next_paints(&mut self, n: u32) {
        self.fail_paints = n;
    }

    /// Fail the next `n` presents. A failed present loses the staged grid.
    pub fn fail_next_presents(&mut self, n: u32) {
        self.fail_presents = n;
    }

    pub fn fail_next_titles(&mut self, n: u32) {
        self.fail_titles = n;
    }

    /// Fail the next `n` resizes. A failed resize keeps the old grids.
    pub fn fail_next_resizes(&mut self, n: u32) {
        self.fail_resizes = n;
    }

    #[must_use]
    pub fn size(&self) -> GridSize {
        self.size
    }

    /// Successful calls since the last [`take_calls`](Self::take_calls).
    #[must_use]
    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.calls)
    }

    #[must_use]
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Last title applied.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Cursor seen in the most recent painted region that contained it.
    #[must_use]
    pub fn cursor(&self) -> Option<CursorState> {
        self.cursor
    }

    /// Staged (not yet presented) text of row `y`, trailing spaces trimmed.
    #[must_use]
    pub fn row_text(&self, y: u16) -> String {
        row_text(&self.staged, self.size, y)
    }

    /// Presented text of row `y`, trailing spaces trimmed.
    #[must_use]
    pub fn presented_text(&self, y: u16) -> String {
        row_text(&self.presented, self.size, y)
    }

    /// Presented cell at `(x, y)`.
    #[must_use]
    pub fn presented_cell(&self, x: u16, y: u16) -> Option<&Cell> {
        (x < self.size.cols && y < self.size.rows)
            .then(|| &self.presented[y as usize * self.size.cols as usize + x as usize])
    }

    fn take_fault(counter: &mut u32) -> bool {
        if *counter > 0 {
            *counter -= 1;
            true
        } else {
            false
        }
    }
}

fn row_text(cells: &[Cell], size: GridSize, y: u16) -> String {
    if y >= size.rows {
        return String::new();
    }
    let start = y as usize * size.cols as usize;
    let text: String = cells[start..start + size.cols as usize]
        .iter()
        .filter(|c| !c.is_wide_continuation())
        .map(Cell::content)
        .collect();
    text.trim_end().to_string()
}

impl RenderEngine for HeadlessEngine {
    fn name(&self) -> &str {
        "headless"
    }

    fn capabilities(&self) -> EngineCaps {
        self.caps
    }

    fn invalidate(&mut self, rect: CellRect) -> Result<(), EngineError> {
        if Self::take_fault(&mut self.fail_paints) {
            return Err(EngineError::draw(rect, "injected invalidate failure"));
        }
        self.calls.push(DrawCall::Invalidate(rect));
        Ok(())
    }

    fn paint_region(&mut self, rect: CellRect, content: &RegionContent) -> Result<(), EngineError> {
        if Self::take_fault(&mut self.fail_paints) {
            return Err(EngineError::draw(rect, "injected paint failure"));
        }
        let cols = self.size.cols;
        for (y, row) in content.rows() {
            if y >= self.size.rows {
                break;
            }
            for (dx, cell) in row.iter().enumerate() {
                let x = content.rect().x as usize + dx;
                if x >= cols as usize {
                    break;
                }
                self.staged[y as usize * cols as usize + x] = *cell;
            }
        }
        if let Some(cursor) = content.cursor() {
            self.cursor = Some(cursor);
        }
        self.calls.push(DrawCall::Paint(rect));
        Ok(())
    }

    fn update_title(&mut self, title: &str) -> Result<(), EngineError> {
        if Self::take_fault(&mut self.fail_titles) {
            return Err(EngineError::Io(std::io::Error::other("injected title failure")));
        }
        title.clone_into(&mut self.title);
        self.calls.push(DrawCall::Title(title.to_owned()));
        Ok(())
    }

    fn present(&mut self) -> Result<(), EngineError> {
        if Self::take_fault(&mut self.fail_presents) {
            self.staged.fill(Cell::default());
            return Err(EngineError::SurfaceLost("injected present failure".into()));
        }
        self.presented.clone_from(&self.staged);
        self.frames_presented += 1;
        self.calls.push(DrawCall::Present);
        Ok(())
    }

    fn resize(&mut self, size: GridSize) -> Result<(), EngineError> {
        if Self::take_fault(&mut self.fail_resizes) {
            return Err(EngineError::Io(std::io::Error::other("injected resize failure")));
        }
        if size != self.size {
            self.size = size;
            self.staged = vec![Cell::default(); size.area()];
            self.presented = vec![Cell::default(); size.area()];
        }
        self.calls.push(DrawCall::Resize(size));
        Ok(())
    }
}
