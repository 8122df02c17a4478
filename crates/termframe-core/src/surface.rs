//! Terminal surface model: cell grid, cursor, selection and title.
//!
//! [`Surface`] is the logical state a producer mutates. Every mutation
//! reports the cells it visually changed as a [`DirtyRegion`], which is what
//! feeds the invalidation tracker. The render side never reads the grid
//! directly while drawing; it takes [`RegionContent`] snapshots through
//! [`SurfaceSource`] and then releases the surface.

use std::sync::{Mutex, PoisonError};

use unicode_width::UnicodeWidthChar;

use crate::cell::{Cell, Color, Style};
use crate::geometry::{CellRect, GridSize};
use crate::region::DirtyRegion;

/// How to measure East Asian Ambiguous characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WidthPolicy {
    /// Ambiguous characters are single-width.
    #[default]
    Standard,
    /// Ambiguous characters are double-width (CJK locales).
    CjkAmbiguousWide,
}

impl WidthPolicy {
    /// Column width of `ch`, clamped to `0..=2`.
    #[inline]
    #[must_use]
    pub fn char_width(self, ch: char) -> u8 {
        let w = match self {
            WidthPolicy::Standard => ch.width().unwrap_or(0),
            WidthPolicy::CjkAmbiguousWide => ch.width_cjk().unwrap_or(0),
        };
        w.min(2) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CursorShape {
    #[default]
    Block,
    Bar,
    Underline,
}

/// Cursor position and presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CursorState {
    pub col: u16,
    pub row: u16,
    pub visible: bool,
    pub shape: CursorShape,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            col: 0,
            row: 0,
            visible: true,
            shape: CursorShape::Block,
        }
    }
}

impl CursorState {
    fn rect(&self) -> CellRect {
        CellRect::cell(self.col, self.row)
    }
}

/// Consistent copy of one rectangle of the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionContent {
    rect: CellRect,
    cells: Vec<Cell>,
    cursor: Option<CursorState>,
    selection: Option<CellRect>,
}

impl RegionContent {
    /// Build a snapshot from raw parts. `cells` must hold `rect.area()` cells
    /// in row-major order.
    ///
    /// # Panics
    ///
    /// Panics if the cell count does not match the rect.
    #[must_use]
    pub fn from_parts(
        rect: CellRect,
        cells: Vec<Cell>,
        cursor: Option<CursorState>,
        selection: Option<CellRect>,
    ) -> Self {
        assert_eq!(
            cells.len(),
            rect.area(),
            "region content holds {} cells for rect {rect}",
            cells.len()
        );
        Self {
            rect,
            cells,
            cursor: cursor.filter(|c| rect.contains_point(c.col, c.row)),
            selection: selection
                .map(|s| s.intersection(&rect))
                .filter(|s| !s.is_empty()),
        }
    }

    #[must_use]
    pub fn rect(&self) -> CellRect {
        self.rect
    }

    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Cells of the `dy`-th row of the rect.
    #[must_use]
    pub fn row(&self, dy: u16) -> &[Cell] {
        let w = self.rect.width as usize;
        let start = dy as usize * w;
        self.cells.get(start..start + w).unwrap_or(&[])
    }

    /// Rows as `(absolute_y, cells)`.
    pub fn rows(&self) -> impl Iterator<Item = (u16, &[Cell])> + '_ {
        (0..self.rect.height).map(move |dy| (self.rect.y + dy, self.row(dy)))
    }

    /// Cell at absolute surface coordinates, if inside the rect.
    #[must_use]
    pub fn cell(&self, x: u16, y: u16) -> Option<&Cell> {
        if !self.rect.contains_point(x, y) {
            return None;
        }
        let idx = (y - self.rect.y) as usize * self.rect.width as usize + (x - self.rect.x) as usize;
        self.cells.get(idx)
    }

    /// The cursor, when it lies inside the rect.
    #[must_use]
    pub fn cursor(&self) -> Option<CursorState> {
        self.cursor
    }

    /// Selection clipped to the rect.
    #[must_use]
    pub fn selection(&self) -> Option<CellRect> {
        self.selection
    }

    /// Drop the cursor, for engines that do not draw one.
    pub fn clear_cursor(&mut self) {
        self.cursor = None;
    }

    /// Drop the selection, for engines that do not highlight one.
    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    #[must_use]
    pub fn is_selected(&self, x: u16, y: u16) -> bool {
        self.selection.is_some_and(|s| s.contains_point(x, y))
    }

    /// Text of one row with trailing spaces trimmed (continuations skipped).
    #[must_use]
    pub fn row_text(&self, dy: u16) -> String {
        let text: String = self
            .row(dy)
            .iter()
            .filter(|c| !c.is_wide_continuation())
            .map(Cell::content)
            .collect();
        text.trim_end().to_string()
    }
}

/// Read access used by the render side to take snapshots.
pub trait SurfaceSource {
    fn size(&self) -> GridSize;

    /// Snapshot of `rect`, clipped to the surface bounds.
    fn snapshot(&self, rect: CellRect) -> RegionContent;
}

/// The logical terminal surface.
#[derive(Debug, Clone)]
pub struct Surface {
    size: GridSize,
    cells: Vec<Cell>,
    cursor: CursorState,
    selection: Option<CellRect>,
    title: String,
    width_policy: WidthPolicy,
}

impl Surface {
    #[must_use]
    pub fn new(size: GridSize) -> Self {
        Self {
            size,
            cells: vec![Cell::default(); size.area()],
            cursor: CursorState::default(),
            selection: None,
            title: String::new(),
            width_policy: WidthPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_width_policy(mut self, policy: WidthPolicy) -> Self {
        self.width_policy = policy;
        self
    }

    #[must_use]
    pub fn size(&self) -> GridSize {
        self.size
    }

    #[must_use]
    pub fn bounds(&self) -> CellRect {
        self.size.bounds()
    }

    #[must_use]
    pub fn cursor(&self) -> CursorState {
        self.cursor
    }

    #[must_use]
    pub fn selection(&self) -> Option<CellRect> {
        self.selection
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[inline]
    fn index(&self, x: u16, y: u16) -> Option<usize> {
        (x < self.size.cols && y < self.size.rows)
            .then(|| y as usize * self.size.cols as usize + x as usize)
    }

    #[must_use]
    pub fn cell(&self, x: u16, y: u16) -> Option<&Cell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    /// Replace one cell. Writing over half of a wide pair blanks the other
    /// half, which is then reported as changed too.
    pub fn set_cell(&mut self, x: u16, y: u16, cell: Cell) -> DirtyRegion {
        let mut changed = RowSpan::default();
        self.put(x, y, cell, &mut changed);
        changed.into_region(y)
    }

    /// Write `text` starting at `(x, y)` without wrapping. Characters past
    /// the right edge are dropped; a wide character that does not fit is
    /// replaced by a blank.
    pub fn write_text(&mut self, x: u16, y: u16, text: &str, style: Style) -> DirtyRegion {
        let mut changed = RowSpan::default();
        if y >= self.size.rows {
            return DirtyRegion::new();
        }
        let mut col = x;
        for ch in text.chars() {
            if col >= self.size.cols {
                break;
            }
            match self.width_policy.char_width(ch) {
                0 => continue,
                1 => {
                    self.put(col, y, Cell::styled(ch, style), &mut changed);
                    col += 1;
                }
                _ => {
                    if col + 1 >= self.size.cols {
                        self.put(col, y, Cell::styled(' ', style), &mut changed);
                        break;
                    }
                    let (lead, cont) = Cell::wide(ch, style);
                    self.put(col, y, lead, &mut changed);
                    self.put(col + 1, y, cont, &mut changed);
                    col += 2;
                }
            }
        }
        changed.into_region(y)
    }

    /// Erase every cell of `rect` to a blank with background `bg`.
    pub fn clear_rect(&mut self, rect: CellRect, bg: Color) -> DirtyRegion {
        let mut region = DirtyRegion::new();
        let rect = rect.clamp_to(&self.bounds());
        for row in rect.rows() {
            let mut changed = RowSpan::default();
            for x in row.x..row.x + row.width {
                let mut blank = Cell::default();
                blank.erase(bg);
                self.put(x, row.y, blank, &mut changed);
            }
            region.extend_from(&changed.into_region(row.y));
        }
        region
    }

    /// Erase the whole surface.
    pub fn clear(&mut self) -> DirtyRegion {
        self.clear_rect(self.bounds(), Color::Default)
    }

    /// Move the cursor (clamped to the grid). Old and new cells are dirty.
    pub fn set_cursor(&mut self, col: u16, row: u16) -> DirtyRegion {
        let col = col.min(self.size.cols.saturating_sub(1));
        let row = row.min(self.size.rows.saturating_sub(1));
        self.update_cursor(CursorState {
            col,
            row,
            ..self.cursor
        })
    }

    pub fn set_cursor_visible(&mut self, visible: bool) -> DirtyRegion {
        self.update_cursor(CursorState {
            visible,
            ..self.cursor
        })
    }

    pub fn set_cursor_shape(&mut self, shape: CursorShape) -> DirtyRegion {
        self.update_cursor(CursorState {
            shape,
            ..self.cursor
        })
    }

    fn update_cursor(&mut self, next: CursorState) -> DirtyRegion {
        let prev = std::mem::replace(&mut self.cursor, next);
        let mut region = DirtyRegion::new();
        if prev == next || self.size.is_empty() || (!prev.visible && !next.visible) {
            return region;
        }
        region.insert(prev.rect().clamp_to(&self.bounds()));
        region.insert(next.rect().clamp_to(&self.bounds()));
        region
    }

    /// Replace the selection. Both the old and the new rect are dirty.
    pub fn set_selection(&mut self, selection: Option<CellRect>) -> DirtyRegion {
        let bounds = self.bounds();
        let next = selection
            .map(|s| s.clamp_to(&bounds))
            .filter(|s| !s.is_empty());
        let prev = std::mem::replace(&mut self.selection, next);
        let mut region = DirtyRegion::new();
        if prev != next {
            region.extend(prev);
            region.extend(next);
        }
        region
    }

    /// Store the title. Returns `true` if it differs from the previous one.
    pub fn set_title(&mut self, title: &str) -> bool {
        if self.title == title {
            return false;
        }
        title.clone_into(&mut self.title);
        true
    }

    /// Resize, keeping the overlapping top-left block of cells. Returns
    /// `false` when the size is unchanged.
    pub fn resize(&mut self, size: GridSize) -> bool {
        if size == self.size {
            return false;
        }
        let mut cells = vec![Cell::default(); size.area()];
        let keep_cols = self.size.cols.min(size.cols) as usize;
        for y in 0..self.size.rows.min(size.rows) as usize {
            let src = y * self.size.cols as usize;
            let dst = y * size.cols as usize;
            cells[dst..dst + keep_cols].copy_from_slice(&self.cells[src..src + keep_cols]);
            if keep_cols > 0 && cells[dst + keep_cols - 1].is_wide() && keep_cols < self.size.cols as usize {
                cells[dst + keep_cols - 1] = Cell::default();
            }
        }
        self.cells = cells;
        self.size = size;
        self.cursor.col = self.cursor.col.min(size.cols.saturating_sub(1));
        self.cursor.row = self.cursor.row.min(size.rows.saturating_sub(1));
        self.selection = self
            .selection
            .map(|s| s.clamp_to(&size.bounds()))
            .filter(|s| !s.is_empty());
        true
    }

    /// Text of row `y` with trailing spaces trimmed.
    #[must_use]
    pub fn row_text(&self, y: u16) -> String {
        self.snapshot(CellRect::new(0, y, self.size.cols, 1))
            .row_text(0)
    }

    fn put(&mut self, x: u16, y: u16, cell: Cell, changed: &mut RowSpan) {
        let Some(idx) = self.index(x, y) else {
            return;
        };
        let old = self.cells[idx];
        if old == cell {
            return;
        }
        if old.is_wide_continuation() && !cell.is_wide_continuation() && x > 0 {
            let lead = idx - 1;
            if self.cells[lead].is_wide() {
                self.cells[lead] = Cell::default();
                changed.add(x - 1);
            }
        }
        if old.is_wide() && !cell.is_wide() && x + 1 < self.size.cols {
            let cont = idx + 1;
            if self.cells[cont].is_wide_continuation() {
                self.cells[cont] = Cell::default();
                changed.add(x + 1);
            }
        }
        self.cells[idx] = cell;
        changed.add(x);
    }
}

impl SurfaceSource for Surface {
    fn size(&self) -> GridSize {
        self.size
    }

    fn snapshot(&self, rect: CellRect) -> RegionContent {
        let rect = rect.clamp_to(&self.bounds());
        let mut cells = Vec::with_capacity(rect.area());
        for row in rect.rows() {
            let start = row.y as usize * self.size.cols as usize + row.x as usize;
            cells.extend_from_slice(&self.cells[start..start + row.width as usize]);
        }
        RegionContent::from_parts(rect, cells, Some(self.cursor), self.selection)
    }
}

impl SurfaceSource for Mutex<Surface> {
    fn size(&self) -> GridSize {
        self.lock().unwrap_or_else(PoisonError::into_inner).size()
    }

    fn snapshot(&self, rect: CellRect) -> RegionContent {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot(rect)
    }
}

/// Column span touched on a single row.
#[derive(Default)]
struct RowSpan(Option<(u16, u16)>);

impl RowSpan {
    fn add(&mut self, x: u16) {
        self.0 = Some(match self.0 {
            None => (x, x),
            Some((lo, hi)) => (lo.min(x), hi.max(x)),
        });
    }

    fn into_region(self, y: u16) -> DirtyRegion {
        match self.0 {
            Some((lo, hi)) => DirtyRegion::from_rect(CellRect::new(lo, y, hi - lo + 1, 1)),
            None => DirtyRegion::new(),
        }
    }
}
