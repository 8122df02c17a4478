#![forbid(unsafe_code)]

//! Invalidation tracker: what changed since the last frame.
//!
//! The tracker is shared between the thread that mutates terminal state
//! (which only marks) and the render thread (which only takes). Every
//! operation is one short critical section; nothing here ever blocks on a
//! backend.
//!
//! # Invariants
//!
//! - Every cell marked dirty between two [`InvalidationTracker::take_dirty_regions`]
//!   calls is covered by the second call's result. Merging and collapsing
//!   may over-report, never under-report.
//! - After a take, [`InvalidationTracker::is_dirty`] is `false` until the
//!   next mark.
//! - A full invalidation is reported as one rect equal to the bounds.

use std::sync::{Mutex, MutexGuard, PoisonError};

use termframe_core::{CellRect, DirtyRegion, GridSize, InsertOutcome, MAX_DIRTY_RECTS};

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerStats {
    /// Region marks received (including requeues).
    pub marks: u64,
    /// Marks that added nothing because the cells were already dirty.
    pub coalesced: u64,
    /// Full-surface invalidations.
    pub full_invalidations: u64,
    /// Times the rect set exceeded its budget and collapsed to a bounding box.
    pub collapses: u64,
    /// Non-empty takes.
    pub takes: u64,
}

#[derive(Debug)]
struct TrackerInner {
    bounds: GridSize,
    dirty: DirtyRegion,
    all_dirty: bool,
    stats: TrackerStats,
}

/// Accumulates dirty cell regions for one render target.
#[derive(Debug)]
pub struct InvalidationTracker {
    inner: Mutex<TrackerInner>,
}

impl InvalidationTracker {
    /// Tracker for a surface of `bounds`. Starts clean.
    #[must_use]
    pub fn new(bounds: GridSize) -> Self {
        Self::with_max_rects(bounds, MAX_DIRTY_RECTS)
    }

    /// Tracker with a custom rect budget.
    #[must_use]
    pub fn with_max_rects(bounds: GridSize, max_rects: usize) -> Self {
        Self {
            inner: Mutex::new(TrackerInner {
                bounds,
                dirty: DirtyRegion::with_max_rects(max_rects),
                all_dirty: false,
                stats: TrackerStats::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record that `rect` must be redrawn. The rect is clipped to the bounds;
    /// empty or already-covered rects are no-ops. Returns `true` if the dirty
    /// set grew.
    pub fn mark_region_dirty(&self, rect: CellRect) -> bool {
        let mut inner = self.lock();
        inner.mark(rect)
    }

    /// Mark the whole visible surface dirty.
    pub fn mark_all_dirty(&self) {
        let mut inner = self.lock();
        inner.stats.full_invalidations += 1;
        if inner.bounds.is_empty() {
            return;
        }
        inner.all_dirty = true;
        inner.dirty.clear();
    }

    /// Return the dirty set and clear it in the same critical section.
    pub fn take_dirty_regions(&self) -> DirtyRegion {
        let mut inner = self.lock();
        let taken = if std::mem::take(&mut inner.all_dirty) {
            inner.dirty.clear();
            let mut full = DirtyRegion::with_max_rects(inner.dirty.max_rects());
            full.insert(inner.bounds.bounds());
            full
        } else {
            inner.dirty.take()
        };
        if !taken.is_empty() {
            inner.stats.takes += 1;
        }
        taken
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        let inner = self.lock();
        inner.all_dirty || !inner.dirty.is_empty()
    }

    /// Whether the next take will be a full-surface invalidation.
    #[must_use]
    pub fn is_all_dirty(&self) -> bool {
        self.lock().all_dirty
    }

    /// Put back regions that were taken but not drawn.
    pub fn requeue(&self, regions: &DirtyRegion) {
        if regions.is_empty() {
            return;
        }
        let mut inner = self.lock();
        for rect in regions {
            inner.mark(*rect);
        }
    }

    /// Change the surface bounds. Everything is dirty afterwards.
    pub fn set_bounds(&self, bounds: GridSize) {
        let mut inner = self.lock();
        inner.bounds = bounds;
        inner.dirty.clear();
        inner.stats.full_invalidations += 1;
        inner.all_dirty = !bounds.is_empty();
    }

    #[must_use]
    pub fn bounds(&self) -> GridSize {
        self.lock().bounds
    }

    #[must_use]
    pub fn stats(&self) -> TrackerStats {
        self.lock().stats
    }
}

impl TrackerInner {
    fn mark(&mut self, rect: CellRect) -> bool {
        self.stats.marks += 1;
        if self.all_dirty {
            self.stats.coalesced += 1;
            return false;
        }
        let rect = rect.clamp_to(&self.bounds.bounds());
        if rect.is_empty() {
            return false;
        }
        match self.dirty.insert_with_outcome(rect) {
            InsertOutcome::Unchanged => {
                self.stats.coalesced += 1;
                false
            }
            InsertOutcome::Added => true,
            InsertOutcome::Collapsed => {
                self.stats.collapses += 1;
                true
            }
        }
    }
}
