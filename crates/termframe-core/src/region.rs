//! Dirty region sets.
//!
//! A [`DirtyRegion`] is a small set of [`CellRect`]s describing the cells that
//! must be redrawn. Stored rects are pairwise disjoint, so painting every
//! rect of a region touches each dirty cell exactly once.
//!
//! On insert, the part of the new rect already covered is subtracted and
//! only the remainder is stored. Remainders are then merged exactly: two
//! rects are fused only when their bounding box covers no extra cell (same
//! row band and touching columns, or same column band and touching rows).
//!
//! When the set grows beyond its rect budget it collapses to the bounding
//! box. That over-reports, which is always safe for redraw purposes.
//!
//! Rects are clipped to the addressable plane `0..u16::MAX` on both axes
//! before they are stored; no grid has cells past it.

use crate::geometry::CellRect;
use smallvec::SmallVec;

/// Default rect budget before a region collapses to its bounding box.
pub const MAX_DIRTY_RECTS: usize = 64;

const PLANE: CellRect = CellRect::new(0, 0, u16::MAX, u16::MAX);

/// What an insert did to a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The rect was empty or already covered.
    Unchanged,
    /// New cells were added.
    Added,
    /// New cells were added and the region collapsed to its bounding box.
    Collapsed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyRegion {
    rects: SmallVec<[CellRect; 8]>,
    max_rects: usize,
}

impl Default for DirtyRegion {
    fn default() -> Self {
        Self::with_max_rects(MAX_DIRTY_RECTS)
    }
}

impl DirtyRegion {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Region with a custom rect budget (clamped to at least 1).
    #[must_use]
    pub fn with_max_rects(max_rects: usize) -> Self {
        Self {
            rects: SmallVec::new(),
            max_rects: max_rects.max(1),
        }
    }

    /// Region covering exactly one rect.
    #[must_use]
    pub fn from_rect(rect: CellRect) -> Self {
        let mut region = Self::default();
        region.insert(rect);
        region
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Number of stored rects (not cells).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    #[must_use]
    pub fn max_rects(&self) -> usize {
        self.max_rects
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CellRect> {
        self.rects.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[CellRect] {
        &self.rects
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }

    /// Move the contents out, leaving an empty region with the same budget.
    pub fn take(&mut self) -> DirtyRegion {
        DirtyRegion {
            rects: std::mem::take(&mut self.rects),
            max_rects: self.max_rects,
        }
    }

    /// Insert a rect. Returns `true` if the covered area may have grown,
    /// `false` when the rect was empty or already fully covered.
    pub fn insert(&mut self, rect: CellRect) -> bool {
        self.insert_with_outcome(rect) != InsertOutcome::Unchanged
    }

    /// Insert a rect and report whether it was stored and whether the
    /// region collapsed to stay within its budget.
    pub fn insert_with_outcome(&mut self, rect: CellRect) -> InsertOutcome {
        let rect = rect.clamp_to(&PLANE);
        if rect.is_empty() || self.covers(&rect) {
            return InsertOutcome::Unchanged;
        }

        self.rects.retain(|r| !rect.contains(r));
        let mut pieces: SmallVec<[CellRect; 8]> = SmallVec::new();
        pieces.push(rect);
        for existing in &self.rects {
            if !pieces.iter().any(|p| p.intersects(existing)) {
                continue;
            }
            pieces = pieces
                .iter()
                .flat_map(|p| subtract(p, existing))
                .collect();
        }
        for piece in pieces {
            self.push_merged(piece);
        }

        if self.rects.len() > self.max_rects {
            let bbox = self.bounding_box();
            self.rects.clear();
            self.rects.push(bbox);
            return InsertOutcome::Collapsed;
        }
        InsertOutcome::Added
    }

    /// Store a rect disjoint from every stored rect, fusing exact merges.
    fn push_merged(&mut self, rect: CellRect) {
        let mut candidate = rect;
        while let Some((idx, merged)) = self
            .rects
            .iter()
            .enumerate()
            .find_map(|(i, r)| exact_merge(&candidate, r).map(|m| (i, m)))
        {
            self.rects.swap_remove(idx);
            candidate = merged;
        }
        self.rects.push(candidate);
    }

    /// Insert every rect of `other`.
    pub fn extend_from(&mut self, other: &DirtyRegion) {
        for rect in other.iter() {
            self.insert(*rect);
        }
    }

    /// Bounding box of all rects (empty when the region is empty).
    #[must_use]
    pub fn bounding_box(&self) -> CellRect {
        self.rects
            .iter()
            .fold(CellRect::default(), |acc, r| acc.union(r))
    }

    /// Number of distinct cells covered. Stored rects are disjoint, so this
    /// is also the number of cells a full paint of the region touches.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.rects.iter().map(CellRect::area).sum()
    }

    /// Whether every cell of `rect` is covered. Empty rects are always covered.
    #[must_use]
    pub fn covers(&self, rect: &CellRect) -> bool {
        if rect.is_empty() {
            return true;
        }
        if self.rects.iter().any(|r| r.contains(rect)) {
            return true;
        }
        let clipped: SmallVec<[CellRect; 8]> = self
            .rects
            .iter()
            .map(|r| r.intersection(rect))
            .filter(|r| !r.is_empty())
            .collect();
        distinct_area(&clipped) == rect.area()
    }

    /// Whether the single cell `(x, y)` is covered.
    #[must_use]
    pub fn contains_point(&self, x: u16, y: u16) -> bool {
        self.rects.iter().any(|r| r.contains_point(x, y))
    }

    /// Clip every rect to `bounds`, dropping rects that fall outside.
    pub fn clip_to(&mut self, bounds: &CellRect) {
        let clipped: SmallVec<[CellRect; 8]> = self
            .rects
            .iter()
            .map(|r| r.clamp_to(bounds))
            .filter(|r| !r.is_empty())
            .collect();
        self.rects = clipped;
    }
}

impl<'a> IntoIterator for &'a DirtyRegion {
    type Item = &'a CellRect;
    type IntoIter = std::slice::Iter<'a, CellRect>;

    fn into_iter(self) -> Self::IntoIter {
        self.rects.iter()
    }
}

impl Extend<CellRect> for DirtyRegion {
    fn extend<T: IntoIterator<Item = CellRect>>(&mut self, iter: T) {
        for rect in iter {
            self.insert(rect);
        }
    }
}

impl FromIterator<CellRect> for DirtyRegion {
    fn from_iter<T: IntoIterator<Item = CellRect>>(iter: T) -> Self {
        let mut region = Self::default();
        region.extend(iter);
        region
    }
}

/// Merge two rects if their bounding box adds no uncovered cells.
fn exact_merge(a: &CellRect, b: &CellRect) -> Option<CellRect> {
    if a.contains(b) {
        return Some(*a);
    }
    if b.contains(a) {
        return Some(*b);
    }
    let same_rows = a.y == b.y && a.height == b.height;
    let same_cols = a.x == b.x && a.width == b.width;
    let cols_touch = (a.x as u32) <= b.right() && (b.x as u32) <= a.right();
    let rows_touch = (a.y as u32) <= b.bottom() && (b.y as u32) <= a.bottom();
    if (same_rows && cols_touch) || (same_cols && rows_touch) {
        Some(a.union(b))
    } else {
        None
    }
}

/// Parts of `a` not covered by `b`, as up to four disjoint rects.
fn subtract(a: &CellRect, b: &CellRect) -> SmallVec<[CellRect; 4]> {
    let mut out = SmallVec::new();
    let cut = a.intersection(b);
    if cut.is_empty() {
        out.push(*a);
        return out;
    }
    let (a_right, a_bottom) = (a.right() as u16, a.bottom() as u16);
    let (cut_right, cut_bottom) = (cut.right() as u16, cut.bottom() as u16);
    let parts = [
        CellRect::new(a.x, a.y, a.width, cut.y - a.y),
        CellRect::new(a.x, cut_bottom, a.width, a_bottom - cut_bottom),
        CellRect::new(a.x, cut.y, cut.x - a.x, cut.height),
        CellRect::new(cut_right, cut.y, a_right - cut_right, cut.height),
    ];
    out.extend(parts.into_iter().filter(|r| !r.is_empty()));
    out
}

/// Distinct cell count of a set of possibly overlapping rects.
///
/// Sweeps horizontal bands between consecutive row edges and merges the
/// column intervals active in each band.
fn distinct_area(rects: &[CellRect]) -> usize {
    let rects: SmallVec<[CellRect; 8]> = rects.iter().copied().filter(|r| !r.is_empty()).collect();
    match rects.len() {
        0 => return 0,
        1 => return rects[0].area(),
        _ => {}
    }

    let mut edges: SmallVec<[u32; 16]> = SmallVec::new();
    for r in &rects {
        edges.push(r.y as u32);
        edges.push(r.bottom());
    }
    edges.sort_unstable();
    edges.dedup();

    let mut total = 0usize;
    let mut spans: SmallVec<[(u32, u32); 16]> = SmallVec::new();
    for band in edges.windows(2) {
        let (top, bottom) = (band[0], band[1]);
        spans.clear();
        spans.extend(
            rects
                .iter()
                .filter(|r| (r.y as u32) <= top && r.bottom() >= bottom)
                .map(|r| (r.x as u32, r.right())),
        );
        if spans.is_empty() {
            continue;
        }
        spans.sort_unstable();
        let mut covered = 0u32;
        let (mut start, mut end) = spans[0];
        for &(s, e) in &spans[1..] {
            if s <= end {
                end = end.max(e);
            } else {
                covered += end - start;
                start = s;
                end = e;
            }
        }
        covered += end - start;
        total += covered as usize * (bottom - top) as usize;
    }
    total
}
