#![forbid(unsafe_code)]

//! End-to-end frame protocol tests: surface mutations flow through the
//! tracker and controller into each backend.

use std::io::{self, Write};
use std::sync::Arc;

use termframe_core::{CellRect, Color, GridSize, Style, StyleFlags, Surface};
use termframe_render::backend::gpu::{GpuEngine, MemoryGpuSurface};
use termframe_render::backend::headless::{DrawCall, HeadlessEngine};
use termframe_render::backend::software::SoftwareEngine;
use termframe_render::{
    EngineBase, FrameController, FrameOutcome, InvalidationTracker, RenderEngine,
};

// ============================================================================
// Helpers
// ============================================================================

struct Target<E: RenderEngine> {
    engine: EngineBase<E>,
    frames: FrameController,
}

impl<E: RenderEngine> Target<E> {
    fn new(engine: E, size: GridSize) -> Self {
        Self {
            engine: EngineBase::new(engine),
            frames: FrameController::new(Arc::new(InvalidationTracker::new(size))),
        }
    }

    fn write(&self, surface: &mut Surface, x: u16, y: u16, text: &str) {
        for rect in &surface.write_text(x, y, text, Style::default()) {
            self.frames.tracker().mark_region_dirty(*rect);
        }
    }

    fn tick(&mut self, surface: &Surface) -> FrameOutcome {
        self.frames.run_frame(&mut self.engine, surface).outcome
    }
}

// ============================================================================
// Headless
// ============================================================================

#[test]
fn only_changed_rows_are_repainted() {
    let size = GridSize::new(20, 6);
    let mut surface = Surface::new(size);
    let mut target = Target::new(HeadlessEngine::new(size), size);
    target.tick(&surface);
    target.engine.backend_mut().take_calls();

    target.write(&mut surface, 0, 3, "prompt $");
    assert_eq!(target.tick(&surface), FrameOutcome::Presented);

    let paints: Vec<_> = target
        .engine
        .backend()
        .calls()
        .iter()
        .filter_map(|c| match c {
            DrawCall::Paint(r) => Some(*r),
            _ => None,
        })
        .collect();
    assert_eq!(paints, vec![CellRect::new(0, 3, 8, 1)]);
    assert_eq!(target.engine.backend().presented_text(3), "prompt $");
}

#[test]
fn mutation_after_take_lands_in_next_frame() {
    let size = GridSize::new(10, 2);
    let mut surface = Surface::new(size);
    let mut target = Target::new(HeadlessEngine::new(size), size);
    target.tick(&surface);

    target.write(&mut surface, 0, 0, "one");
    assert!(target.frames.begin_frame_if_needed(&target.engine));
    target.frames.paint(&mut target.engine, &surface);
    target.write(&mut surface, 0, 1, "two");
    target.frames.end_frame();

    assert!(target.frames.tracker().is_dirty());
    target.tick(&surface);
    assert_eq!(target.engine.backend().presented_text(1), "two");
}

#[test]
fn title_burst_commits_once_per_frame() {
    let size = GridSize::new(4, 1);
    let surface = Surface::new(size);
    let mut target = Target::new(HeadlessEngine::new(size), size);
    target.tick(&surface);
    target.engine.backend_mut().take_calls();

    for t in ["~", "~/src", "~/src/termframe"] {
        target.engine.propose_title(t);
    }
    target.tick(&surface);
    target.engine.propose_title("~/src/termframe");
    assert_eq!(target.tick(&surface), FrameOutcome::Skipped);

    let titles: Vec<_> = target
        .engine
        .backend()
        .calls()
        .iter()
        .filter(|c| matches!(c, DrawCall::Title(_)))
        .cloned()
        .collect();
    assert_eq!(titles, vec![DrawCall::Title("~/src/termframe".into())]);
}

#[test]
fn failed_title_is_retried_and_frame_degrades() {
    let size = GridSize::new(4, 1);
    let surface = Surface::new(size);
    let mut target = Target::new(HeadlessEngine::new(size), size);
    target.tick(&surface);

    target.engine.backend_mut().fail_next_titles(1);
    target.engine.propose_title("t");
    assert_eq!(
        target.tick(&surface),
        FrameOutcome::Degraded { failed_regions: 0 }
    );
    assert!(target.engine.title_pending());
    assert_eq!(target.tick(&surface), FrameOutcome::Presented);
    assert_eq!(target.engine.backend().title(), "t");
}

#[test]
fn replacing_backend_redraws_everything_and_recommits_title() {
    let size = GridSize::new(6, 2);
    let mut surface = Surface::new(size);
    let mut target = Target::new(HeadlessEngine::new(size), size);
    target.write(&mut surface, 0, 0, "keep");
    target.engine.propose_title("session");
    target.tick(&surface);

    target.engine.replace_backend(HeadlessEngine::new(size));
    target.frames.reset_backend_state();
    target.tick(&surface);

    let fresh = target.engine.backend();
    assert_eq!(fresh.presented_text(0), "keep");
    assert_eq!(fresh.title(), "session");
}

// ============================================================================
// Software
// ============================================================================

#[test]
fn software_frame_contains_title_then_cells() {
    let size = GridSize::new(8, 2);
    let mut surface = Surface::new(size);
    surface.set_cursor_visible(false);
    let mut target = Target::new(SoftwareEngine::new(Vec::new(), size), size);
    target.engine.propose_title("sh");
    for rect in &surface.write_text(
        0,
        1,
        "ok",
        Style::new(Color::Named(2), Color::Default).with_flags(StyleFlags::BOLD),
    ) {
        target.frames.tracker().mark_region_dirty(*rect);
    }
    target.tick(&surface);

    let out = String::from_utf8(target.engine.backend().writer().clone()).unwrap();
    let title_at = out.find("\x1b]0;sh\x1b\\").unwrap();
    let cells_at = out.find("\x1b[1m\x1b[32mok").unwrap();
    assert!(title_at < cells_at);
}

/// Writer that fails the next `failures` writes, then records bytes.
#[derive(Default)]
struct FlakyWriter {
    failures: u32,
    bytes: Vec<u8>,
}

impl Write for FlakyWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "terminal went away"));
        }
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn software_title_survives_failed_write() {
    let size = GridSize::new(6, 1);
    let mut surface = Surface::new(size);
    surface.set_cursor_visible(false);
    let writer = FlakyWriter {
        failures: 1,
        ..FlakyWriter::default()
    };
    let mut target = Target::new(SoftwareEngine::new(writer, size), size);
    target.engine.propose_title("vim");
    target.write(&mut surface, 0, 0, "edit");

    assert_eq!(
        target.tick(&surface),
        FrameOutcome::PresentFailed { consecutive: 1 }
    );
    assert!(target.engine.backend().writer().bytes.is_empty());
    assert!(target.engine.title_pending());

    for _ in 0..3 {
        target.tick(&surface);
    }
    let out = String::from_utf8_lossy(&target.engine.backend().writer().bytes).into_owned();
    assert_eq!(out.matches("\x1b]0;vim\x1b\\").count(), 1);
    assert!(out.contains("edit"));
    assert_eq!(target.engine.last_committed_title(), "vim");
    assert!(!target.engine.title_pending());
}

// ============================================================================
// GPU
// ============================================================================

#[test]
fn gpu_recovers_from_device_loss_with_full_redraw() {
    let size = GridSize::new(10, 3);
    let mut surface = Surface::new(size);
    let mut target = Target::new(GpuEngine::new(MemoryGpuSurface::new(), size), size);
    target.write(&mut surface, 0, 0, "before");
    assert_eq!(target.tick(&surface), FrameOutcome::Presented);

    target.engine.backend_mut().surface_mut().lose();
    target.write(&mut surface, 0, 2, "after");
    assert_eq!(
        target.tick(&surface),
        FrameOutcome::PresentFailed { consecutive: 1 }
    );
    assert!(target.frames.tracker().is_all_dirty());

    assert_eq!(target.tick(&surface), FrameOutcome::Presented);
    let gpu = target.engine.backend().surface();
    assert_eq!(gpu.shown_text(0), "before");
    assert_eq!(gpu.shown_text(2), "after");
    assert_eq!(target.engine.backend().last_stats().dirty_cells, 30);
}

#[test]
fn boxed_engines_share_one_controller_type() {
    let size = GridSize::new(4, 1);
    let surface = Surface::new(size);
    let engines: Vec<Box<dyn RenderEngine>> = vec![
        Box::new(HeadlessEngine::new(size)),
        Box::new(SoftwareEngine::new(Vec::new(), size)),
        Box::new(GpuEngine::new(MemoryGpuSurface::new(), size)),
    ];
    for engine in engines {
        let mut target = Target::new(engine, size);
        assert_eq!(target.tick(&surface), FrameOutcome::Presented);
        assert_eq!(target.tick(&surface), FrameOutcome::Skipped);
    }
}
