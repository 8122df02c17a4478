#![forbid(unsafe_code)]

//! Frame controller: the begin → paint → present → end cycle.
//!
//! One [`FrameController`] drives one render target. It owns the frame state
//! machine and shares the [`InvalidationTracker`] with the producer side.
//!
//! ```text
//!   Idle ──begin_frame_if_needed──▶ Painting ──end_frame──▶ Presented ──▶ Idle
//!    ▲                                 │
//!    └───────── abort / present failed ┘
//! ```
//!
//! # Failure handling
//!
//! - A region whose invalidate or paint fails is requeued at `end_frame`
//!   and retried next frame. Other regions are unaffected.
//! - A failed title commit stays pending in the engine base.
//! - A failed present aborts the frame: nothing is confirmed, the whole
//!   surface is marked dirty and the title is re-sent, since the backend
//!   may have drawn part of the frame or dropped all of it.
//! - A failed resize degrades the frame and is retried next frame with a
//!   full redraw.
//!
//! Snapshots handed to an engine without [`EngineCaps::CURSOR`] or
//! [`EngineCaps::SELECTION`] carry no cursor or selection.
//! - Calling an operation in the wrong state is a caller bug and panics.

use std::sync::Arc;
use std::time::Duration;

use termframe_core::{CellRect, DirtyRegion, EngineCaps, GridSize, SurfaceSource};
use tracing::{debug, info_span, trace, warn};
use web_time::Instant;

use crate::engine::RenderEngine;
use crate::engine_base::EngineBase;
use crate::invalidation::InvalidationTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameState {
    /// No frame in progress.
    Idle,
    /// Dirty regions claimed, backend calls in flight.
    Painting,
    /// Backend confirmed the frame. Transient: `end_frame` returns to `Idle`.
    Presented,
}

/// What one `paint` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaintSummary {
    /// Regions painted successfully.
    pub regions_painted: usize,
    /// Sum of painted region areas.
    pub cells_painted: usize,
    /// Regions whose invalidate or paint failed.
    pub regions_failed: usize,
    /// A title reached the engine base's commit step this frame.
    pub title_committed: bool,
    pub title_failed: bool,
    /// The backend was told about a new surface size.
    pub resized: bool,
    pub resize_failed: bool,
    pub present_failed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Nothing was dirty; no backend call was made.
    Skipped,
    /// Every region and the title made it to the screen.
    Presented,
    /// Presented, but some regions or the title failed and will be retried.
    Degraded { failed_regions: usize },
    /// Present failed; the whole surface is dirty again.
    PresentFailed { consecutive: u32 },
}

/// Result of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// Sequence number of the frame (counts started frames).
    pub frame: u64,
    pub outcome: FrameOutcome,
    pub paint: PaintSummary,
    pub elapsed: Duration,
}

impl FrameReport {
    fn skipped(frame: u64) -> Self {
        Self {
            frame,
            outcome: FrameOutcome::Skipped,
            paint: PaintSummary::default(),
            elapsed: Duration::ZERO,
        }
    }

    /// Whether the backend showed a new frame.
    #[must_use]
    pub fn presented(&self) -> bool {
        matches!(
            self.outcome,
            FrameOutcome::Presented | FrameOutcome::Degraded { .. }
        )
    }
}

/// Drives frames for one render target.
#[derive(Debug)]
pub struct FrameController {
    tracker: Arc<InvalidationTracker>,
    state: FrameState,
    painted: bool,
    claimed: DirtyRegion,
    failed: DirtyRegion,
    summary: PaintSummary,
    last_size: Option<GridSize>,
    force_full_redraw: bool,
    consecutive_present_failures: u32,
    frames: u64,
    started: Option<Instant>,
}

impl FrameController {
    /// Controller for a fresh render target. Nothing has been shown yet, so
    /// the tracker is marked fully dirty.
    #[must_use]
    pub fn new(tracker: Arc<InvalidationTracker>) -> Self {
        tracker.mark_all_dirty();
        Self {
            tracker,
            state: FrameState::Idle,
            painted: false,
            claimed: DirtyRegion::new(),
            failed: DirtyRegion::new(),
            summary: PaintSummary::default(),
            last_size: None,
            force_full_redraw: false,
            consecutive_present_failures: 0,
            frames: 0,
            started: None,
        }
    }

    /// Repaint the full surface every frame, even for partial-present engines.
    #[must_use]
    pub fn with_force_full_redraw(mut self, enabled: bool) -> Self {
        self.force_full_redraw = enabled;
        self
    }

    #[must_use]
    pub fn state(&self) -> FrameState {
        self.state
    }

    #[must_use]
    pub fn tracker(&self) -> &Arc<InvalidationTracker> {
        &self.tracker
    }

    #[must_use]
    pub fn consecutive_present_failures(&self) -> u32 {
        self.consecutive_present_failures
    }

    /// Number of frames started so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Treat the backend as brand new: the next frame resizes it and
    /// repaints everything.
    pub fn reset_backend_state(&mut self) {
        self.last_size = None;
        self.consecutive_present_failures = 0;
        self.tracker.mark_all_dirty();
    }

    /// Start a frame if anything needs drawing. Returns `false` without any
    /// state change or backend call when the tracker is clean and no title
    /// change is pending.
    ///
    /// # Panics
    ///
    /// Panics unless the controller is `Idle`.
    pub fn begin_frame_if_needed<E: RenderEngine>(&mut self, engine: &EngineBase<E>) -> bool {
        assert_eq!(
            self.state,
            FrameState::Idle,
            "begin_frame_if_needed called while a frame is in progress"
        );
        if !self.tracker.is_dirty() && !engine.title_pending() {
            return false;
        }
        self.state = FrameState::Painting;
        self.painted = false;
        self.summary = PaintSummary::default();
        self.frames += 1;
        self.started = Some(Instant::now());
        trace!(frame = self.frames, engine = engine.name(), "frame begin");
        true
    }

    /// Paint the frame: title first, then a resize if the surface changed
    /// size, then every dirty region, then exactly one present.
    ///
    /// # Panics
    ///
    /// Panics unless the controller is `Painting` and `paint` has not already
    /// run for this frame.
    pub fn paint<E, S>(&mut self, engine: &mut EngineBase<E>, source: &S) -> PaintSummary
    where
        E: RenderEngine,
        S: SurfaceSource + ?Sized,
    {
        assert_eq!(
            self.state,
            FrameState::Painting,
            "paint called outside of a frame"
        );
        assert!(!self.painted, "paint called twice in one frame");
        self.painted = true;

        let size = source.size();
        let _span = info_span!(
            "render_frame",
            frame = self.frames,
            engine = engine.name(),
            width = size.cols,
            height = size.rows
        )
        .entered();

        match engine.commit_title_if_changed() {
            Ok(committed) => self.summary.title_committed = committed,
            Err(err) => {
                warn!(engine = engine.name(), error = %err, "title commit failed; will retry");
                self.summary.title_failed = true;
            }
        }

        if self.last_size != Some(size) {
            if self.tracker.bounds() != size {
                self.tracker.set_bounds(size);
            } else {
                self.tracker.mark_all_dirty();
            }
            match engine.resize(size) {
                Ok(()) => {
                    self.last_size = Some(size);
                    self.summary.resized = true;
                }
                Err(err) => {
                    warn!(engine = engine.name(), error = %err, %size, "backend resize failed; will retry");
                    self.summary.resize_failed = true;
                }
            }
        }

        let caps = engine.capabilities();
        let mut regions = self.tracker.take_dirty_regions();
        if (self.force_full_redraw || !caps.contains(EngineCaps::PARTIAL_PRESENT))
            && !size.is_empty()
        {
            regions = DirtyRegion::from_rect(size.bounds());
        }
        self.claimed = regions;
        let claimed = self.claimed.clone();

        for rect in &claimed {
            self.paint_one(engine, source, *rect, caps);
        }

        if let Err(err) = engine.present() {
            warn!(
                engine = engine.name(),
                error = %err,
                surface_lost = err.is_surface_lost(),
                "present failed; forcing full redraw"
            );
            engine.forget_committed_title();
            self.summary.present_failed = true;
        }

        debug!(
            regions = self.summary.regions_painted,
            cells = self.summary.cells_painted,
            failed = self.summary.regions_failed,
            "frame painted"
        );
        self.summary
    }

    fn paint_one<E, S>(&mut self, engine: &mut EngineBase<E>, source: &S, rect: CellRect, caps: EngineCaps)
    where
        E: RenderEngine,
        S: SurfaceSource + ?Sized,
    {
        if caps.contains(EngineCaps::INVALIDATE)
            && let Err(err) = engine.invalidate(rect)
        {
            debug!(engine = engine.name(), %rect, error = %err, "invalidate failed; region requeued");
            self.failed.insert(rect);
            self.summary.regions_failed += 1;
            return;
        }
        let mut content = source.snapshot(rect);
        if !caps.contains(EngineCaps::CURSOR) {
            content.clear_cursor();
        }
        if !caps.contains(EngineCaps::SELECTION) {
            content.clear_selection();
        }
        match engine.paint_region(rect, &content) {
            Ok(()) => {
                self.summary.regions_painted += 1;
                self.summary.cells_painted += rect.area();
            }
            Err(err) => {
                debug!(engine = engine.name(), %rect, error = %err, "paint failed; region requeued");
                self.failed.insert(rect);
                self.summary.regions_failed += 1;
            }
        }
    }

    /// Finish the frame. Failed regions go back to the tracker; a failed
    /// present marks the whole surface dirty instead.
    ///
    /// # Panics
    ///
    /// Panics unless the controller is `Painting` and `paint` has run.
    pub fn end_frame(&mut self) -> FrameReport {
        assert_eq!(
            self.state,
            FrameState::Painting,
            "end_frame called outside of a frame"
        );
        assert!(self.painted, "end_frame called before paint");

        let outcome = if self.summary.present_failed {
            self.tracker.mark_all_dirty();
            self.consecutive_present_failures += 1;
            self.state = FrameState::Idle;
            FrameOutcome::PresentFailed {
                consecutive: self.consecutive_present_failures,
            }
        } else {
            self.state = FrameState::Presented;
            self.consecutive_present_failures = 0;
            self.tracker.requeue(&self.failed);
            if self.summary.resize_failed {
                self.tracker.mark_all_dirty();
            }
            if self.failed.is_empty() && !self.summary.title_failed && !self.summary.resize_failed {
                FrameOutcome::Presented
            } else {
                FrameOutcome::Degraded {
                    failed_regions: self.summary.regions_failed,
                }
            }
        };

        let report = FrameReport {
            frame: self.frames,
            outcome,
            paint: self.summary,
            elapsed: self.started.take().map_or(Duration::ZERO, |t| t.elapsed()),
        };
        self.finish();
        report
    }

    /// Cancel the frame in progress. Claimed regions are requeued since none
    /// of them is confirmed on screen. No-op when `Idle`.
    pub fn abort(&mut self) {
        if self.state != FrameState::Painting {
            return;
        }
        debug!(frame = self.frames, regions = self.claimed.len(), "frame aborted");
        self.tracker.requeue(&self.claimed);
        self.started = None;
        self.finish();
    }

    fn finish(&mut self) {
        self.claimed.clear();
        self.failed.clear();
        self.painted = false;
        self.state = FrameState::Idle;
    }

    /// `begin_frame_if_needed` + `paint` + `end_frame`.
    pub fn run_frame<E, S>(&mut self, engine: &mut EngineBase<E>, source: &S) -> FrameReport
    where
        E: RenderEngine,
        S: SurfaceSource + ?Sized,
    {
        if !self.begin_frame_if_needed(engine) {
            return FrameReport::skipped(self.frames);
        }
        self.paint(engine, source);
        self.end_frame()
    }
}

impl Drop for FrameController {
    fn drop(&mut self) {
        self.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::{DrawCall, HeadlessEngine};
    use termframe_core::{Style, Surface};

    fn setup(cols: u16, rows: u16) -> (FrameController, EngineBase<HeadlessEngine>, Surface) {
        let size = GridSize::new(cols, rows);
        let tracker = Arc::new(InvalidationTracker::new(size));
        let engine = EngineBase::new(HeadlessEngine::new(size));
        (FrameController::new(tracker), engine, Surface::new(size))
    }

    fn settle(ctl: &mut FrameController, engine: &mut EngineBase<HeadlessEngine>, surface: &Surface) {
        ctl.run_frame(engine, surface);
        engine.backend_mut().take_calls();
    }

    #[test]
    fn first_frame_paints_everything() {
        let (mut ctl, mut engine, surface) = setup(10, 3);
        let report = ctl.run_frame(&mut engine, &surface);
        assert_eq!(report.outcome, FrameOutcome::Presented);
        assert!(report.paint.resized);
        assert_eq!(report.paint.cells_painted, 30);
    }

    #[test]
    fn clean_tracker_skips_without_backend_calls() {
        let (mut ctl, mut engine, surface) = setup(10, 3);
        settle(&mut ctl, &mut engine, &surface);

        assert!(!ctl.begin_frame_if_needed(&engine));
        assert_eq!(ctl.state(), FrameState::Idle);
        let report = ctl.run_frame(&mut engine, &surface);
        assert_eq!(report.outcome, FrameOutcome::Skipped);
        assert!(engine.backend().calls().is_empty());
    }

    #[test]
    fn title_only_frame_commits_and_presents() {
        let (mut ctl, mut engine, surface) = setup(10, 3);
        settle(&mut ctl, &mut engine, &surface);

        engine.propose_title("hello");
        let report = ctl.run_frame(&mut engine, &surface);
        assert!(report.paint.title_committed);
        assert_eq!(report.paint.regions_painted, 0);
        assert_eq!(
            engine.backend().calls(),
            &[DrawCall::Title("hello".into()), DrawCall::Present]
        );
    }

    #[test]
    fn title_commits_before_region_paints() {
        let (mut ctl, mut engine, mut surface) = setup(10, 3);
        settle(&mut ctl, &mut engine, &surface);

        let dirty = surface.write_text(0, 1, "x", Style::default());
        for rect in &dirty {
            ctl.tracker().mark_region_dirty(*rect);
        }
        engine.propose_title("t");
        ctl.run_frame(&mut engine, &surface);

        let calls = engine.backend().calls();
        assert!(matches!(calls.first(), Some(DrawCall::Title(_))));
        assert!(matches!(calls.last(), Some(DrawCall::Present)));
        assert_eq!(calls.iter().filter(|c| **c == DrawCall::Present).count(), 1);
    }

    #[test]
    fn failed_region_is_retried_next_frame() {
        let (mut ctl, mut engine, mut surface) = setup(10, 3);
        settle(&mut ctl, &mut engine, &surface);

        for rect in &surface.write_text(0, 2, "retry", Style::default()) {
            ctl.tracker().mark_region_dirty(*rect);
        }
        engine.backend_mut().fail_next_paints(1);

        let first = ctl.run_frame(&mut engine, &surface);
        assert_eq!(first.outcome, FrameOutcome::Degraded { failed_regions: 1 });
        assert!(ctl.tracker().is_dirty());
        assert_eq!(engine.backend().presented_text(2), "");

        let second = ctl.run_frame(&mut engine, &surface);
        assert_eq!(second.outcome, FrameOutcome::Presented);
        assert_eq!(engine.backend().presented_text(2), "retry");
        assert!(!ctl.tracker().is_dirty());
    }

    #[test]
    fn present_failure_forces_full_redraw() {
        let (mut ctl, mut engine, surface) = setup(10, 3);
        settle(&mut ctl, &mut engine, &surface);

        ctl.tracker().mark_region_dirty(CellRect::cell(1, 1));
        engine.backend_mut().fail_next_presents(2);

        let first = ctl.run_frame(&mut engine, &surface);
        assert_eq!(first.outcome, FrameOutcome::PresentFailed { consecutive: 1 });
        assert!(ctl.tracker().is_all_dirty());

        let second = ctl.run_frame(&mut engine, &surface);
        assert_eq!(second.outcome, FrameOutcome::PresentFailed { consecutive: 2 });
        assert_eq!(second.paint.cells_painted, 30);

        let third = ctl.run_frame(&mut engine, &surface);
        assert_eq!(third.outcome, FrameOutcome::Presented);
        assert_eq!(ctl.consecutive_present_failures(), 0);
    }

    #[test]
    fn present_failure_resends_title() {
        let (mut ctl, mut engine, surface) = setup(10, 3);
        settle(&mut ctl, &mut engine, &surface);

        engine.propose_title("vim");
        engine.backend_mut().fail_next_presents(1);
        let failed = ctl.run_frame(&mut engine, &surface);
        assert_eq!(failed.outcome, FrameOutcome::PresentFailed { consecutive: 1 });
        assert!(engine.title_pending());

        engine.backend_mut().take_calls();
        let retry = ctl.run_frame(&mut engine, &surface);
        assert_eq!(retry.outcome, FrameOutcome::Presented);
        assert!(retry.paint.title_committed);
        assert_eq!(
            engine.backend().calls().first(),
            Some(&DrawCall::Title("vim".into()))
        );
        assert_eq!(engine.last_committed_title(), "vim");
    }

    #[test]
    fn overlapping_marks_paint_each_cell_once() {
        let (mut ctl, mut engine, surface) = setup(10, 10);
        settle(&mut ctl, &mut engine, &surface);

        ctl.tracker().mark_region_dirty(CellRect::new(0, 0, 4, 4));
        ctl.tracker().mark_region_dirty(CellRect::new(2, 2, 4, 4));
        let report = ctl.run_frame(&mut engine, &surface);
        assert_eq!(report.paint.cells_painted, 16 + 16 - 4);

        let painted: Vec<CellRect> = engine
            .backend()
            .calls()
            .iter()
            .filter_map(|c| match c {
                DrawCall::Paint(r) => Some(*r),
                _ => None,
            })
            .collect();
        for (i, a) in painted.iter().enumerate() {
            for b in &painted[i + 1..] {
                assert!(!a.intersects(b), "{a} painted twice via {b}");
            }
        }
    }

    #[test]
    fn failed_resize_is_retried_next_frame() {
        let (mut ctl, mut engine, mut surface) = setup(10, 3);
        settle(&mut ctl, &mut engine, &surface);

        let smaller = GridSize::new(6, 2);
        surface.resize(smaller);
        ctl.tracker().set_bounds(smaller);
        engine.backend_mut().fail_next_resizes(1);

        let first = ctl.run_frame(&mut engine, &surface);
        assert!(first.paint.resize_failed);
        assert!(!first.paint.resized);
        assert_eq!(first.outcome, FrameOutcome::Degraded { failed_regions: 0 });
        assert_eq!(engine.backend().size(), GridSize::new(10, 3));
        assert!(ctl.tracker().is_all_dirty());

        let second = ctl.run_frame(&mut engine, &surface);
        assert!(second.paint.resized);
        assert_eq!(second.outcome, FrameOutcome::Presented);
        assert_eq!(engine.backend().size(), smaller);
        assert_eq!(second.paint.cells_painted, 12);
    }

    #[test]
    fn cursor_and_selection_only_reach_engines_that_draw_them() {
        let size = GridSize::new(6, 1);
        let mut surface = Surface::new(size);
        surface.set_cursor(2, 0);
        surface.set_selection(Some(CellRect::new(0, 0, 3, 1)));

        let mut plain = EngineBase::new(
            HeadlessEngine::new(size).with_capabilities(EngineCaps::PARTIAL_PRESENT),
        );
        let mut ctl = FrameController::new(Arc::new(InvalidationTracker::new(size)));
        ctl.run_frame(&mut plain, &surface);
        assert_eq!(plain.backend().cursor(), None);

        let mut full = EngineBase::new(HeadlessEngine::new(size));
        let mut ctl = FrameController::new(Arc::new(InvalidationTracker::new(size)));
        ctl.run_frame(&mut full, &surface);
        assert_eq!(full.backend().cursor().map(|c| c.col), Some(2));
    }

    #[test]
    fn abort_requeues_claimed_regions() {
        let (mut ctl, mut engine, surface) = setup(10, 3);
        settle(&mut ctl, &mut engine, &surface);

        ctl.tracker().mark_region_dirty(CellRect::new(0, 0, 4, 1));
        assert!(ctl.begin_frame_if_needed(&engine));
        ctl.paint(&mut engine, &surface);
        assert!(!ctl.tracker().is_dirty());
        ctl.abort();

        assert_eq!(ctl.state(), FrameState::Idle);
        assert!(ctl.tracker().take_dirty_regions().covers(&CellRect::new(0, 0, 4, 1)));
    }

    #[test]
    fn drop_mid_frame_requeues() {
        let size = GridSize::new(10, 3);
        let tracker = Arc::new(InvalidationTracker::new(size));
        let mut engine = EngineBase::new(HeadlessEngine::new(size));
        let surface = Surface::new(size);
        {
            let mut ctl = FrameController::new(Arc::clone(&tracker));
            ctl.run_frame(&mut engine, &surface);
            tracker.mark_region_dirty(CellRect::cell(2, 2));
            assert!(ctl.begin_frame_if_needed(&engine));
            ctl.paint(&mut engine, &surface);
        }
        assert!(tracker.take_dirty_regions().contains_point(2, 2));
    }

    #[test]
    fn engine_without_partial_present_gets_full_surface() {
        let size = GridSize::new(8, 2);
        let tracker = Arc::new(InvalidationTracker::new(size));
        let mut engine = EngineBase::new(
            HeadlessEngine::new(size).with_capabilities(EngineCaps::HEADLESS),
        );
        let surface = Surface::new(size);
        let mut ctl = FrameController::new(tracker);
        settle(&mut ctl, &mut engine, &surface);

        ctl.tracker().mark_region_dirty(CellRect::cell(0, 0));
        let report = ctl.run_frame(&mut engine, &surface);
        assert_eq!(report.paint.cells_painted, 16);
        assert!(engine.backend().calls().contains(&DrawCall::Paint(size.bounds())));
    }

    #[test]
    fn invalidate_only_sent_when_advertised() {
        let size = GridSize::new(4, 1);
        let tracker = Arc::new(InvalidationTracker::new(size));
        let mut engine = EngineBase::new(
            HeadlessEngine::new(size)
                .with_capabilities(EngineCaps::PARTIAL_PRESENT | EngineCaps::INVALIDATE),
        );
        let surface = Surface::new(size);
        let mut ctl = FrameController::new(tracker);
        ctl.run_frame(&mut engine, &surface);
        let calls = engine.backend_mut().take_calls();
        assert_eq!(
            calls,
            vec![
                DrawCall::Resize(size),
                DrawCall::Invalidate(size.bounds()),
                DrawCall::Paint(size.bounds()),
                DrawCall::Present,
            ]
        );

        let mut plain = EngineBase::new(
            HeadlessEngine::new(size).with_capabilities(EngineCaps::PARTIAL_PRESENT),
        );
        let mut ctl = FrameController::new(Arc::new(InvalidationTracker::new(size)));
        ctl.run_frame(&mut plain, &surface);
        assert!(!plain
            .backend()
            .calls()
            .iter()
            .any(|c| matches!(c, DrawCall::Invalidate(_))));
    }

    #[test]
    fn surface_resize_is_forwarded_once() {
        let (mut ctl, mut engine, mut surface) = setup(10, 3);
        settle(&mut ctl, &mut engine, &surface);

        surface.resize(GridSize::new(6, 2));
        ctl.tracker().set_bounds(GridSize::new(6, 2));
        let report = ctl.run_frame(&mut engine, &surface);
        assert!(report.paint.resized);
        assert_eq!(ctl.tracker().bounds(), GridSize::new(6, 2));
        assert!(engine
            .backend()
            .calls()
            .contains(&DrawCall::Resize(GridSize::new(6, 2))));
        assert_eq!(report.paint.cells_painted, 12);
    }

    #[test]
    #[should_panic(expected = "paint called outside of a frame")]
    fn paint_outside_frame_panics() {
        let (mut ctl, mut engine, surface) = setup(2, 2);
        ctl.paint(&mut engine, &surface);
    }

    #[test]
    #[should_panic(expected = "end_frame called outside of a frame")]
    fn end_frame_outside_frame_panics() {
        let (mut ctl, _engine, _surface) = setup(2, 2);
        ctl.end_frame();
    }

    #[test]
    #[should_panic(expected = "begin_frame_if_needed called while a frame is in progress")]
    fn nested_begin_panics() {
        let (mut ctl, engine, _surface) = setup(2, 2);
        ctl.tracker().mark_all_dirty();
        assert!(ctl.begin_frame_if_needed(&engine));
        ctl.begin_frame_if_needed(&engine);
    }
}
