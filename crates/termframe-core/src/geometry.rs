//! Cell-coordinate geometry.
//!
//! Everything in the render pipeline is addressed in terminal cells, never
//! pixels. Rectangles are half-open: a rect covers columns `x..x + width`
//! and rows `y..y + height`.

use std::fmt;

/// Grid dimensions in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GridSize {
    pub cols: u16,
    pub rows: u16,
}

impl GridSize {
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    /// Total number of cells.
    #[must_use]
    pub const fn area(self) -> usize {
        self.cols as usize * self.rows as usize
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.cols == 0 || self.rows == 0
    }

    /// Rectangle covering the whole grid.
    #[must_use]
    pub const fn bounds(self) -> CellRect {
        CellRect::new(0, 0, self.cols, self.rows)
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

/// A rectangle of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellRect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl CellRect {
    #[must_use]
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A single-cell rect.
    #[must_use]
    pub const fn cell(x: u16, y: u16) -> Self {
        Self::new(x, y, 1, 1)
    }

    /// A full row span `[x0, x1)` on row `y`.
    #[must_use]
    pub const fn row_span(y: u16, x0: u16, x1: u16) -> Self {
        Self::new(x0, y, x1.saturating_sub(x0), 1)
    }

    /// Exclusive right edge. Saturates at `u32` so edges never wrap.
    #[inline]
    #[must_use]
    pub const fn right(&self) -> u32 {
        self.x as u32 + self.width as u32
    }

    /// Exclusive bottom edge.
    #[inline]
    #[must_use]
    pub const fn bottom(&self) -> u32 {
        self.y as u32 + self.height as u32
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    #[must_use]
    pub const fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[must_use]
    pub const fn contains_point(&self, x: u16, y: u16) -> bool {
        (x as u32) >= self.x as u32
            && (x as u32) < self.right()
            && (y as u32) >= self.y as u32
            && (y as u32) < self.bottom()
    }

    /// Whether `other` lies entirely inside `self`. Empty rects are contained
    /// by everything.
    #[must_use]
    pub const fn contains(&self, other: &CellRect) -> bool {
        if other.is_empty() {
            return true;
        }
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Whether the two rects share at least one cell.
    #[must_use]
    pub const fn intersects(&self, other: &CellRect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && (self.x as u32) < other.right()
            && (other.x as u32) < self.right()
            && (self.y as u32) < other.bottom()
            && (other.y as u32) < self.bottom()
    }

    /// Overlapping or sharing an edge (corner contact does not count).
    #[must_use]
    pub fn touches(&self, other: &CellRect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        let cols_overlap = (self.x as u32) < other.right() && (other.x as u32) < self.right();
        let rows_overlap = (self.y as u32) < other.bottom() && (other.y as u32) < self.bottom();
        let cols_touch = (self.x as u32) <= other.right() && (other.x as u32) <= self.right();
        let rows_touch = (self.y as u32) <= other.bottom() && (other.y as u32) <= self.bottom();
        (cols_overlap && rows_touch) || (rows_overlap && cols_touch)
    }

    /// Intersection, or an empty rect when the two do not overlap.
    #[must_use]
    pub fn intersection(&self, other: &CellRect) -> CellRect {
        if !self.intersects(other) {
            return CellRect::default();
        }
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        CellRect::new(x0, y0, (x1 - x0 as u32) as u16, (y1 - y0 as u32) as u16)
    }

    /// Bounding box of both rects. An empty operand is ignored.
    #[must_use]
    pub fn union(&self, other: &CellRect) -> CellRect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right()).min(u16::MAX as u32);
        let y1 = self.bottom().max(other.bottom()).min(u16::MAX as u32);
        CellRect::new(x0, y0, (x1 - x0 as u32) as u16, (y1 - y0 as u32) as u16)
    }

    /// Clip to the given bounds.
    #[must_use]
    pub fn clamp_to(&self, bounds: &CellRect) -> CellRect {
        self.intersection(bounds)
    }

    /// Iterate the rows covered by this rect as single-row rects.
    pub fn rows(&self) -> impl Iterator<Item = CellRect> + use<> {
        let (x, y, width) = (self.x, self.y, self.width);
        let height = if width == 0 { 0 } else { self.height };
        (0..height).map(move |dy| CellRect::new(x, y.saturating_add(dy), width, 1))
    }
}

impl fmt::Display for CellRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{} {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_rects() {
        assert!(CellRect::new(3, 3, 0, 5).is_empty());
        assert!(CellRect::new(3, 3, 5, 0).is_empty());
        assert!(!CellRect::cell(0, 0).is_empty());
        assert_eq!(CellRect::new(0, 0, 10, 2).area(), 20);
    }

    #[test]
    fn contains_and_intersects() {
        let outer = CellRect::new(0, 0, 10, 10);
        let inner = CellRect::new(2, 2, 3, 3);
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(outer.intersects(&inner));
        assert!(outer.contains(&CellRect::default()));

        let right = CellRect::new(10, 0, 2, 2);
        assert!(!outer.intersects(&right));
    }

    #[test]
    fn touches_counts_shared_edges_not_corners() {
        let a = CellRect::new(0, 0, 10, 1);
        let below = CellRect::new(0, 1, 10, 1);
        let beside = CellRect::new(10, 0, 5, 1);
        let corner = CellRect::new(10, 1, 2, 2);
        assert!(a.touches(&below));
        assert!(a.touches(&beside));
        assert!(!a.touches(&corner));
        assert!(!a.touches(&CellRect::new(0, 2, 10, 1)));
    }

    #[test]
    fn intersection_and_union() {
        let a = CellRect::new(0, 0, 4, 4);
        let b = CellRect::new(2, 2, 4, 4);
        assert_eq!(a.intersection(&b), CellRect::new(2, 2, 2, 2));
        assert_eq!(a.union(&b), CellRect::new(0, 0, 6, 6));
        assert!(a.intersection(&CellRect::new(8, 8, 1, 1)).is_empty());
        assert_eq!(CellRect::default().union(&b), b);
    }

    #[test]
    fn clamp_to_bounds() {
        let bounds = GridSize::new(80, 24).bounds();
        let r = CellRect::new(70, 20, 20, 10);
        assert_eq!(r.clamp_to(&bounds), CellRect::new(70, 20, 10, 4));
        assert!(CellRect::new(100, 0, 5, 5).clamp_to(&bounds).is_empty());
    }

    #[test]
    fn edges_do_not_wrap_near_u16_max() {
        let r = CellRect::new(u16::MAX - 1, 0, 10, 1);
        assert_eq!(r.right(), u16::MAX as u32 + 9);
        assert!(r.contains_point(u16::MAX, 0));
    }

    #[test]
    fn rows_iterates_single_row_rects() {
        let r = CellRect::new(1, 2, 3, 2);
        let rows: Vec<_> = r.rows().collect();
        assert_eq!(rows, vec![CellRect::new(1, 2, 3, 1), CellRect::new(1, 3, 3, 1)]);
        assert_eq!(CellRect::new(0, 0, 0, 5).rows().count(), 0);
    }

    #[test]
    fn display_formats() {
        assert_eq!(CellRect::new(1, 2, 3, 4).to_string(), "(1,2 3x4)");
        assert_eq!(GridSize::new(80, 24).to_string(), "80x24");
    }
}
