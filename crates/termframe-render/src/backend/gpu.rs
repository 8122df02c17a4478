#![forbid(unsafe_code)]

//! GPU cell engine.
//!
//! Cells are packed into fixed 16-byte [`CellData`] instances matching a
//! one-instance-per-cell shader layout. Painted regions become contiguous
//! [`CellPatch`] spans in linear grid order; `present` uploads the patches
//! and submits one instanced draw covering the grid.
//!
//! Device handling lives behind [`GpuSurface`]. A surface that reports
//! itself lost fails the present with [`EngineError::SurfaceLost`]; the
//! engine reconfigures it on the next frame and the controller's full
//! redraw restores the contents.

use termframe_core::{Cell, CellRect, Color, CursorShape, EngineCaps, GridSize, RegionContent};
use tracing::{debug, trace};

use crate::engine::{EngineError, RenderEngine};

/// Size of one [`CellData`] instance in bytes.
pub const CELL_DATA_BYTES: usize = 16;

/// Attribute bit set on the cursor cell.
pub const CELL_ATTR_CURSOR: u32 = 1 << 8;
/// Attribute bit set on selected cells.
pub const CELL_ATTR_SELECTED: u32 = 1 << 9;
/// Attribute bit set on wide-character continuations (not drawn).
pub const CELL_ATTR_CONTINUATION: u32 = 1 << 10;
/// Shift of the 2-bit cursor shape field.
pub const CELL_ATTR_CURSOR_SHAPE_SHIFT: u32 = 12;

const DEFAULT_FG: u32 = 0xE5E5_E5FF;
const DEFAULT_BG: u32 = 0x0000_00FF;

/// One GPU cell instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellData {
    /// Background color as packed RGBA (R in high byte, A in low byte).
    pub bg_rgba: u32,
    pub fg_rgba: u32,
    /// Glyph identifier; the codepoint, 0 for blanks and continuations.
    pub glyph_id: u32,
    /// Bits 0..8: style flags; higher bits: `CELL_ATTR_*`.
    pub attrs: u32,
}

impl CellData {
    pub const EMPTY: Self = Self {
        bg_rgba: DEFAULT_BG,
        fg_rgba: DEFAULT_FG,
        glyph_id: 0,
        attrs: 0,
    };

    /// Pack a surface cell.
    #[must_use]
    pub fn from_cell(cell: &Cell) -> Self {
        let glyph_id = if cell.is_wide_continuation() || cell.content() == ' ' {
            0
        } else {
            cell.content() as u32
        };
        let mut attrs = u32::from(cell.style.flags.bits() & 0xFF);
        if cell.is_wide_continuation() {
            attrs |= CELL_ATTR_CONTINUATION;
        }
        Self {
            bg_rgba: pack_rgba(cell.style.bg, DEFAULT_BG),
            fg_rgba: pack_rgba(cell.style.fg, DEFAULT_FG),
            glyph_id,
            attrs,
        }
    }

    /// Serialize to 16 little-endian bytes.
    #[must_use]
    pub fn to_bytes(self) -> [u8; CELL_DATA_BYTES] {
        let mut buf = [0u8; CELL_DATA_BYTES];
        buf[0..4].copy_from_slice(&self.bg_rgba.to_le_bytes());
        buf[4..8].copy_from_slice(&self.fg_rgba.to_le_bytes());
        buf[8..12].copy_from_slice(&self.glyph_id.to_le_bytes());
        buf[12..16].copy_from_slice(&self.attrs.to_le_bytes());
        buf
    }
}

impl Default for CellData {
    fn default() -> Self {
        Self::EMPTY
    }
}

fn pack_rgba(color: Color, default: u32) -> u32 {
    color.to_rgb().map_or(default, |(r, g, b)| {
        (u32::from(r) << 24) | (u32::from(g) << 16) | (u32::from(b) << 8) | 0xFF
    })
}

fn cursor_shape_bits(shape: CursorShape) -> u32 {
    match shape {
        CursorShape::Block => 0,
        CursorShape::Bar => 1,
        CursorShape::Underline => 2,
    }
}

/// A contiguous span of cells to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellPatch {
    /// Linear offset into the cell grid (`row * cols + col`).
    pub offset: u32,
    pub cells: Vec<CellData>,
}

impl CellPatch {
    /// Byte offset of the patch in the instance buffer.
    #[must_use]
    pub fn byte_offset(&self) -> u64 {
        u64::from(self.offset) * CELL_DATA_BYTES as u64
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.cells.len() * CELL_DATA_BYTES);
        for cell in &self.cells {
            out.extend_from_slice(&cell.to_bytes());
        }
        out
    }
}

/// Device seam for [`GpuEngine`].
pub trait GpuSurface: Send {
    /// (Re)create the instance buffer for a grid. Clears it to empty cells.
    fn configure(&mut self, size: GridSize) -> Result<(), EngineError>;

    /// Write instance bytes at `byte_offset`.
    fn write_cells(&mut self, byte_offset: u64, bytes: &[u8]) -> Result<(), EngineError>;

    /// Draw `instance_count` cells and show the result.
    fn submit(&mut self, instance_count: u32) -> Result<(), EngineError>;

    /// Whether the device lost the surface since the last configure.
    fn is_lost(&self) -> bool;
}

/// Statistics of the last present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GpuFrameStats {
    pub patches: usize,
    pub dirty_cells: usize,
    pub bytes_uploaded: usize,
    pub instance_count: u32,
}

/// Instanced-cell engine over a [`GpuSurface`].
#[derive(Debug)]
pub struct GpuEngine<S: GpuSurface> {
    surface: S,
    size: GridSize,
    patches: Vec<CellPatch>,
    needs_configure: bool,
    last_stats: GpuFrameStats,
}

impl<S: GpuSurface> GpuEngine<S> {
    #[must_use]
    pub fn new(surface: S, size: GridSize) -> Self {
        Self {
            surface,
            size,
            patches: Vec::new(),
            needs_configure: true,
            last_stats: GpuFrameStats::default(),
        }
    }

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Patches staged for the next present.
    #[must_use]
    pub fn pending_patches(&self) -> &[CellPatch] {
        &self.patches
    }

    #[must_use]
    pub fn last_stats(&self) -> GpuFrameStats {
        self.last_stats
    }

    /// Configure the surface if a resize or a failed present asked for it.
    /// A surface lost mid-stream is left alone here; the next present reports
    /// it so the whole grid gets repainted.
    fn ensure_configured(&mut self) -> Result<(), EngineError> {
        if self.needs_configure {
            self.surface.configure(self.size)?;
            self.needs_configure = false;
            debug!(size = %self.size, "gpu surface configured");
        }
        Ok(())
    }

    fn push_span(&mut self, offset: u32, cells: Vec<CellData>) {
        if let Some(last) = self.patches.last_mut()
            && last.offset + last.cells.len() as u32 == offset
        {
            last.cells.extend(cells);
            return;
        }
        self.patches.push(CellPatch { offset, cells });
    }
}

impl<S: GpuSurface> RenderEngine for GpuEngine<S> {
    fn name(&self) -> &str {
        "gpu"
    }

    /// No title: a GPU surface has no window chrome of its own.
    fn capabilities(&self) -> EngineCaps {
        EngineCaps::SURFACE.difference(EngineCaps::TITLE) | EngineCaps::INVALIDATE
    }

    fn invalidate(&mut self, _rect: CellRect) -> Result<(), EngineError> {
        self.ensure_configured()
    }

    fn paint_region(&mut self, rect: CellRect, content: &RegionContent) -> Result<(), EngineError> {
        let cols = u32::from(self.size.cols);
        let region = content.rect();
        let visible = region.clamp_to(&self.size.bounds());
        if visible.is_empty() {
            return Ok(());
        }
        if visible != region {
            return Err(EngineError::draw(rect, "region outside configured grid"));
        }
        let cursor = content.cursor().filter(|c| c.visible);
        for (y, row) in content.rows() {
            let cells = row
                .iter()
                .enumerate()
                .map(|(dx, cell)| {
                    let x = region.x + dx as u16;
                    let mut data = CellData::from_cell(cell);
                    if let Some(c) = cursor
                        && c.col == x
                        && c.row == y
                    {
                        data.attrs |= CELL_ATTR_CURSOR
                            | (cursor_shape_bits(c.shape) << CELL_ATTR_CURSOR_SHAPE_SHIFT);
                    }
                    if content.is_selected(x, y) {
                        data.attrs |= CELL_ATTR_SELECTED;
                    }
                    data
                })
                .collect();
            self.push_span(u32::from(y) * cols + u32::from(region.x), cells);
        }
        Ok(())
    }

    fn present(&mut self) -> Result<(), EngineError> {
        let patches = std::mem::take(&mut self.patches);
        if self.surface.is_lost() {
            self.needs_configure = true;
            return Err(EngineError::SurfaceLost("gpu surface lost before upload".into()));
        }
        self.ensure_configured()?;

        let mut stats = GpuFrameStats {
            patches: patches.len(),
            ..GpuFrameStats::default()
        };
        for patch in &patches {
            let bytes = patch.to_bytes();
            self.surface.write_cells(patch.byte_offset(), &bytes)?;
            stats.dirty_cells += patch.cells.len();
            stats.bytes_uploaded += bytes.len();
        }
        stats.instance_count = self.size.area() as u32;
        if let Err(err) = self.surface.submit(stats.instance_count) {
            self.needs_configure = true;
            return Err(err);
        }
        trace!(
            patches = stats.patches,
            cells = stats.dirty_cells,
            bytes = stats.bytes_uploaded,
            "gpu frame submitted"
        );
        self.last_stats = stats;
        Ok(())
    }

    fn resize(&mut self, size: GridSize) -> Result<(), EngineError> {
        if size != self.size {
            self.size = size;
            self.patches.clear();
            self.needs_configure = true;
        }
        self.ensure_configured()
    }
}

/// In-process [`GpuSurface`] backed by a byte buffer.
///
/// Keeps the instance buffer in memory and a copy of it as of the last
/// submit, so hosts without a device (and tests) can inspect what would be
/// on screen. Loss can be injected with [`MemoryGpuSurface::lose`].
#[derive(Debug, Default)]
pub struct MemoryGpuSurface {
    size: GridSize,
    buffer: Vec<u8>,
    shown: Vec<u8>,
    lost: bool,
    configures: u32,
    submits: u32,
}

impl MemoryGpuSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate device loss: contents are gone until the next configure.
    pub fn lose(&mut self) {
        self.lost = true;
        self.buffer.fill(0);
    }

    #[must_use]
    pub fn configures(&self) -> u32 {
        self.configures
    }

    #[must_use]
    pub fn submits(&self) -> u32 {
        self.submits
    }

    /// Instance shown by the last submit at `(x, y)`.
    #[must_use]
    pub fn shown_cell(&self, x: u16, y: u16) -> Option<CellData> {
        if x >= self.size.cols || y >= self.size.rows {
            return None;
        }
        let idx = (y as usize * self.size.cols as usize + x as usize) * CELL_DATA_BYTES;
        let bytes = self.shown.get(idx..idx + CELL_DATA_BYTES)?;
        let word = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        Some(CellData {
            bg_rgba: word(0),
            fg_rgba: word(4),
            glyph_id: word(8),
            attrs: word(12),
        })
    }

    /// Text shown on row `y`, trailing blanks trimmed.
    #[must_use]
    pub fn shown_text(&self, y: u16) -> String {
        let text: String = (0..self.size.cols)
            .filter_map(|x| self.shown_cell(x, y))
            .filter(|c| c.attrs & CELL_ATTR_CONTINUATION == 0)
            .map(|c| char::from_u32(c.glyph_id).filter(|ch| *ch != '\0').unwrap_or(' '))
            .collect();
        text.trim_end().to_string()
    }
}

impl GpuSurface for MemoryGpuSurface {
    fn configure(&mut self, size: GridSize) -> Result<(), EngineError> {
        self.size = size;
        let mut buffer = Vec::with_capacity(size.area() * CELL_DATA_BYTES);
        for _ in 0..size.area() {
            buffer.extend_from_slice(&CellData::EMPTY.to_bytes());
        }
        self.buffer = buffer;
        self.lost = false;
        self.configures += 1;
        Ok(())
    }

    fn write_cells(&mut self, byte_offset: u64, bytes: &[u8]) -> Result<(), EngineError> {
        if self.lost {
            return Err(EngineError::SurfaceLost("write to lost surface".into()));
        }
        let start = usize::try_from(byte_offset)
            .map_err(|_| EngineError::SurfaceLost("offset overflow".into()))?;
        let end = start + bytes.len();
        let Some(dst) = self.buffer.get_mut(start..end) else {
            return Err(EngineError::SurfaceLost(format!(
                "write {start}..{end} past buffer of {} bytes",
                self.buffer.len()
            )));
        };
        dst.copy_from_slice(bytes);
        Ok(())
    }

    fn submit(&mut self, instance_count: u32) -> Result<(), EngineError> {
        if self.lost {
            return Err(EngineError::SurfaceLost("submit on lost surface".into()));
        }
        let used = instance_count as usize * CELL_DATA_BYTES;
        self.shown.clear();
        self.shown.extend_from_slice(&self.buffer[..used.min(self.buffer.len())]);
        self.submits += 1;
        Ok(())
    }

    fn is_lost(&self) -> bool {
        self.lost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termframe_core::{Style, StyleFlags, Surface, SurfaceSource};

    fn engine(size: GridSize) -> GpuEngine<MemoryGpuSurface> {
        let mut engine = GpuEngine::new(MemoryGpuSurface::new(), size);
        engine.resize(size).unwrap();
        engine
    }

    #[test]
    fn cell_data_layout() {
        let cell = Cell::styled(
            'A',
            Style::new(Color::Rgb(0x11, 0x22, 0x33), Color::Default).with_flags(StyleFlags::BOLD),
        );
        let data = CellData::from_cell(&cell);
        assert_eq!(data.fg_rgba, 0x1122_33FF);
        assert_eq!(data.bg_rgba, DEFAULT_BG);
        assert_eq!(data.glyph_id, 'A' as u32);
        assert_eq!(data.attrs, 1);

        let bytes = data.to_bytes();
        assert_eq!(&bytes[4..8], &0x1122_33FFu32.to_le_bytes());
        assert_eq!(&bytes[8..12], &65u32.to_le_bytes());
        assert_eq!(CellData::from_cell(&Cell::default()).glyph_id, 0);
    }

    #[test]
    fn rows_of_full_width_region_coalesce_into_one_patch() {
        let size = GridSize::new(4, 3);
        let surface = Surface::new(size);
        let mut gpu = engine(size);
        let rect = CellRect::new(0, 1, 4, 2);
        gpu.paint_region(rect, &surface.snapshot(rect)).unwrap();
        assert_eq!(gpu.pending_patches().len(), 1);
        assert_eq!(gpu.pending_patches()[0].offset, 4);
        assert_eq!(gpu.pending_patches()[0].cells.len(), 8);
    }

    #[test]
    fn narrow_region_yields_patch_per_row() {
        let size = GridSize::new(10, 3);
        let surface = Surface::new(size);
        let mut gpu = engine(size);
        let rect = CellRect::new(2, 0, 3, 2);
        gpu.paint_region(rect, &surface.snapshot(rect)).unwrap();
        let offsets: Vec<u32> = gpu.pending_patches().iter().map(|p| p.offset).collect();
        assert_eq!(offsets, vec![2, 12]);
    }

    #[test]
    fn present_uploads_and_shows_text() {
        let size = GridSize::new(8, 2);
        let mut surface = Surface::new(size);
        surface.write_text(1, 1, "gpu", Style::default());
        let mut gpu = engine(size);
        gpu.paint_region(size.bounds(), &surface.snapshot(size.bounds()))
            .unwrap();
        gpu.present().unwrap();

        assert_eq!(gpu.surface().shown_text(1), " gpu");
        let stats = gpu.last_stats();
        assert_eq!(stats.dirty_cells, 16);
        assert_eq!(stats.bytes_uploaded, 16 * CELL_DATA_BYTES);
        assert_eq!(stats.instance_count, 16);
        assert!(gpu.pending_patches().is_empty());
    }

    #[test]
    fn cursor_and_selection_bits() {
        let size = GridSize::new(3, 1);
        let mut surface = Surface::new(size);
        surface.set_cursor(1, 0);
        surface.set_selection(Some(CellRect::cell(2, 0)));
        let mut gpu = engine(size);
        gpu.paint_region(size.bounds(), &surface.snapshot(size.bounds()))
            .unwrap();
        gpu.present().unwrap();

        let shown = |x| gpu.surface().shown_cell(x, 0).unwrap().attrs;
        assert_eq!(shown(0) & (CELL_ATTR_CURSOR | CELL_ATTR_SELECTED), 0);
        assert_ne!(shown(1) & CELL_ATTR_CURSOR, 0);
        assert_ne!(shown(2) & CELL_ATTR_SELECTED, 0);
    }

    #[test]
    fn titles_are_not_sent_to_the_gpu() {
        let size = GridSize::new(2, 1);
        let gpu = engine(size);
        assert!(!gpu.capabilities().contains(EngineCaps::TITLE));
        assert!(gpu.capabilities().contains(EngineCaps::CURSOR | EngineCaps::SELECTION));

        let mut base = crate::EngineBase::new(gpu);
        base.propose_title("shell");
        assert!(base.commit_title_if_changed().unwrap());
        assert_eq!(base.title_commits(), 0);
        assert!(!base.title_pending());
    }

    #[test]
    fn lost_surface_fails_present_then_reconfigures() {
        let size = GridSize::new(2, 1);
        let surface = Surface::new(size);
        let mut gpu = engine(size);
        assert_eq!(gpu.surface().configures(), 1);

        gpu.surface_mut().lose();
        gpu.paint_region(size.bounds(), &surface.snapshot(size.bounds()))
            .unwrap();
        let err = gpu.present().unwrap_err();
        assert!(err.is_surface_lost());

        gpu.invalidate(size.bounds()).unwrap();
        gpu.paint_region(size.bounds(), &surface.snapshot(size.bounds()))
            .unwrap();
        gpu.present().unwrap();
        assert_eq!(gpu.surface().configures(), 2);
        assert_eq!(gpu.surface().submits(), 1);
    }
}
