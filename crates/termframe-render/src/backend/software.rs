#![forbid(unsafe_code)]

//! Software engine: renders regions as ANSI escape sequences.
//!
//! Painting only stages bytes. `present` writes the whole staged frame and
//! flushes, so a frame reaches the writer all at once or not at all.
//!
//! Output per painted row: a CUP to the row start, then the cells with an
//! SGR sequence emitted whenever the style changes. Wide continuations are
//! skipped. The cursor cell and selected cells are drawn in reverse video.

use std::io::{self, Write};

use termframe_core::{Cell, CellRect, Color, EngineCaps, GridSize, RegionContent, Style, StyleFlags};
use tracing::trace;

use crate::engine::{EngineError, RenderEngine};

const SGR_RESET: &[u8] = b"\x1b[0m";

/// ANSI-emitting engine over any writer.
#[derive(Debug)]
pub struct SoftwareEngine<W: Write + Send> {
    writer: W,
    staged: Vec<u8>,
    size: GridSize,
    bytes_written: u64,
}

impl<W: Write + Send> SoftwareEngine<W> {
    #[must_use]
    pub fn new(writer: W, size: GridSize) -> Self {
        Self {
            writer,
            staged: Vec::with_capacity(size.area() * 4),
            size,
            bytes_written: 0,
        }
    }

    /// Bytes staged for the next present.
    #[must_use]
    pub fn staged(&self) -> &[u8] {
        &self.staged
    }

    /// Total bytes written by successful presents.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    #[must_use]
    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn stage_row(&mut self, y: u16, x0: u16, cells: &[Cell], content: &RegionContent) -> io::Result<()> {
        write!(self.staged, "\x1b[{};{}H", y as u32 + 1, x0 as u32 + 1)?;
        let mut current: Option<Style> = None;
        for (dx, cell) in cells.iter().enumerate() {
            if cell.is_wide_continuation() {
                continue;
            }
            let x = x0 + dx as u16;
            let mut style = cell.style;
            let on_cursor = content
                .cursor()
                .is_some_and(|c| c.visible && c.col == x && c.row == y);
            if on_cursor || content.is_selected(x, y) {
                style.flags.toggle(StyleFlags::INVERSE);
            }
            if current != Some(style) {
                self.staged.extend_from_slice(SGR_RESET);
                emit_style(&mut self.staged, &style)?;
                current = Some(style);
            }
            let mut buf = [0u8; 4];
            let ch = if cell.content().is_control() {
                ' '
            } else {
                cell.content()
            };
            self.staged.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
        }
        self.staged.extend_from_slice(SGR_RESET);
        Ok(())
    }
}

fn emit_style(out: &mut Vec<u8>, style: &Style) -> io::Result<()> {
    const FLAG_CODES: [(StyleFlags, u8); 8] = [
        (StyleFlags::BOLD, 1),
        (StyleFlags::DIM, 2),
        (StyleFlags::ITALIC, 3),
        (StyleFlags::UNDERLINE, 4),
        (StyleFlags::BLINK, 5),
        (StyleFlags::INVERSE, 7),
        (StyleFlags::HIDDEN, 8),
        (StyleFlags::STRIKETHROUGH, 9),
    ];
    for (flag, code) in FLAG_CODES {
        if style.flags.contains(flag) {
            write!(out, "\x1b[{code}m")?;
        }
    }
    emit_color(out, style.fg, 30, 38)?;
    emit_color(out, style.bg, 40, 48)
}

fn emit_color(out: &mut Vec<u8>, color: Color, base: u8, extended: u8) -> io::Result<()> {
    match color {
        Color::Default => Ok(()),
        Color::Named(n) if n < 8 => write!(out, "\x1b[{}m", base + n),
        Color::Named(n) => write!(out, "\x1b[{}m", base + 60 + (n & 0x07)),
        Color::Indexed(n) => write!(out, "\x1b[{extended};5;{n}m"),
        Color::Rgb(r, g, b) => write!(out, "\x1b[{extended};2;{r};{g};{b}m"),
    }
}

/// Strip control characters so a title cannot terminate its own sequence.
fn sanitize_title(title: &str) -> String {
    title.chars().filter(|c| !c.is_control()).collect()
}

impl<W: Write + Send> RenderEngine for SoftwareEngine<W> {
    fn name(&self) -> &str {
        "software"
    }

    fn capabilities(&self) -> EngineCaps {
        EngineCaps::SURFACE
    }

    fn paint_region(&mut self, rect: CellRect, content: &RegionContent) -> Result<(), EngineError> {
        let clipped = content.rect().clamp_to(&self.size.bounds());
        if clipped.is_empty() {
            return Ok(());
        }
        let x0 = content.rect().x;
        for (y, row) in content.rows() {
            if y >= self.size.rows {
                break;
            }
            let visible = (self.size.cols.saturating_sub(x0) as usize).min(row.len());
            self.stage_row(y, x0, &row[..visible], content)
                .map_err(|err| EngineError::draw(rect, err.to_string()))?;
        }
        Ok(())
    }

    fn update_title(&mut self, title: &str) -> Result<(), EngineError> {
        write!(self.staged, "\x1b]0;{}\x1b\\", sanitize_title(title))?;
        Ok(())
    }

    fn present(&mut self) -> Result<(), EngineError> {
        let frame = std::mem::take(&mut self.staged);
        self.writer.write_all(&frame)?;
        self.writer.flush()?;
        self.bytes_written += frame.len() as u64;
        trace!(bytes = frame.len(), "software frame written");
        self.staged = frame;
        self.staged.clear();
        Ok(())
    }

    fn resize(&mut self, size: GridSize) -> Result<(), EngineError> {
        self.size = size;
        self.staged.extend_from_slice(b"\x1b[2J");
        Ok(())
    }
}
