#![forbid(unsafe_code)]

//! Producer-facing shared surface.
//!
//! [`SharedSurface`] is the only way the producer (parser, application) touches
//! the terminal surface once render targets exist. Each mutation runs under
//! the surface lock, the lock is released, and only then are the changed
//! cells marked dirty on every subscribed target. The render side does the
//! reverse: it takes its dirty regions first and snapshots each one under a
//! short lock, so a mutation racing with a frame is either in the snapshot
//! or still marked for the next frame.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use termframe_core::{
    Cell, CellRect, Color, CursorState, DirtyRegion, GridSize, RegionContent, Style, Surface,
    SurfaceSource,
};
use termframe_render::{InvalidationTracker, TitleProposer};
use tracing::trace;

/// Handle returned by [`SharedSurface::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug)]
struct Subscriber {
    id: SubscriptionId,
    tracker: Arc<InvalidationTracker>,
    title: TitleProposer,
}

#[derive(Debug, Default)]
struct Subscribers {
    next_id: u64,
    list: Vec<Subscriber>,
}

#[derive(Debug)]
struct Shared {
    // Lock order: surface before subscribers.
    surface: Mutex<Surface>,
    subscribers: Mutex<Subscribers>,
}

/// Cloneable handle to a surface shared between a producer and renderers.
#[derive(Debug, Clone)]
pub struct SharedSurface {
    shared: Arc<Shared>,
}

impl SharedSurface {
    #[must_use]
    pub fn new(size: GridSize) -> Self {
        Self::from_surface(Surface::new(size))
    }

    #[must_use]
    pub fn from_surface(surface: Surface) -> Self {
        Self {
            shared: Arc::new(Shared {
                surface: Mutex::new(surface),
                subscribers: Mutex::new(Subscribers::default()),
            }),
        }
    }

    fn surface(&self) -> MutexGuard<'_, Surface> {
        self.shared
            .surface
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribers(&self) -> MutexGuard<'_, Subscribers> {
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a render target. Its tracker is resized to the surface and
    /// the current title is proposed so a late subscriber catches up.
    pub fn subscribe(&self, tracker: Arc<InvalidationTracker>, title: TitleProposer) -> SubscriptionId {
        let surface = self.surface();
        if tracker.bounds() != surface.size() {
            tracker.set_bounds(surface.size());
        }
        title.propose(surface.title());
        let mut subs = self.subscribers();
        let id = SubscriptionId(subs.next_id);
        subs.next_id += 1;
        subs.list.push(Subscriber { id, tracker, title });
        trace!(subscription = id.0, "render target subscribed");
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscribers();
        let before = subs.list.len();
        subs.list.retain(|s| s.id != id);
        subs.list.len() != before
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers().list.len()
    }

    fn mark(&self, region: &DirtyRegion) {
        if region.is_empty() {
            return;
        }
        for sub in &self.subscribers().list {
            for rect in region {
                sub.tracker.mark_region_dirty(*rect);
            }
        }
    }

    fn mutate(&self, f: impl FnOnce(&mut Surface) -> DirtyRegion) -> DirtyRegion {
        let region = f(&mut *self.surface());
        self.mark(&region);
        region
    }

    // ── producer operations ─────────────────────────────────────────────

    pub fn write_text(&self, x: u16, y: u16, text: &str, style: Style) -> DirtyRegion {
        self.mutate(|s| s.write_text(x, y, text, style))
    }

    pub fn set_cell(&self, x: u16, y: u16, cell: Cell) -> DirtyRegion {
        self.mutate(|s| s.set_cell(x, y, cell))
    }

    pub fn clear_rect(&self, rect: CellRect, bg: Color) -> DirtyRegion {
        self.mutate(|s| s.clear_rect(rect, bg))
    }

    pub fn clear(&self) -> DirtyRegion {
        self.mutate(Surface::clear)
    }

    pub fn set_cursor(&self, col: u16, row: u16) -> DirtyRegion {
        self.mutate(|s| s.set_cursor(col, row))
    }

    pub fn set_cursor_visible(&self, visible: bool) -> DirtyRegion {
        self.mutate(|s| s.set_cursor_visible(visible))
    }

    pub fn set_selection(&self, selection: Option<CellRect>) -> DirtyRegion {
        self.mutate(|s| s.set_selection(selection))
    }

    /// Resize the surface. Every subscribed tracker is rebounded, which
    /// marks it fully dirty.
    pub fn resize(&self, size: GridSize) -> bool {
        let mut surface = self.surface();
        if !surface.resize(size) {
            return false;
        }
        // Rebounded under the surface lock so racing resizes leave every
        // tracker at the size the surface ends up with.
        for sub in &self.subscribers().list {
            sub.tracker.set_bounds(size);
        }
        true
    }

    /// Set the title and propose it to every target.
    pub fn propose_title(&self, title: &str) {
        let mut surface = self.surface();
        surface.set_title(title);
        // Proposed under the surface lock so concurrent producers cannot
        // reorder titles.
        for sub in &self.subscribers().list {
            sub.title.propose(title);
        }
    }

    /// Force a full redraw on every target.
    pub fn mark_all_dirty(&self) {
        for sub in &self.subscribers().list {
            sub.tracker.mark_all_dirty();
        }
    }

    // ── reads ───────────────────────────────────────────────────────────

    #[must_use]
    pub fn title(&self) -> String {
        self.surface().title().to_owned()
    }

    #[must_use]
    pub fn cursor(&self) -> CursorState {
        self.surface().cursor()
    }

    #[must_use]
    pub fn row_text(&self, y: u16) -> String {
        self.surface().row_text(y)
    }

    /// Run `f` with the surface locked. Keep `f` short; producers block
    /// meanwhile.
    pub fn with_surface<R>(&self, f: impl FnOnce(&Surface) -> R) -> R {
        f(&*self.surface())
    }
}

impl SurfaceSource for SharedSurface {
    fn size(&self) -> GridSize {
        self.surface().size()
    }

    fn snapshot(&self, rect: CellRect) -> RegionContent {
        self.surface().snapshot(rect)
    }
}
