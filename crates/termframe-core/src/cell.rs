//! Surface cell: the unit every backend draws.
//!
//! A cell stores one character plus its style. Wide (2-column) characters
//! occupy a leading cell and a continuation cell; backends draw the leading
//! cell and skip the continuation.

use bitflags::bitflags;

bitflags! {
    /// Text style flags.
    ///
    /// Bit values follow SGR parameter order so ANSI emitters can map them
    /// one to one.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StyleFlags: u16 {
        const BOLD          = 1 << 0;
        const DIM           = 1 << 1;
        const ITALIC        = 1 << 2;
        const UNDERLINE     = 1 << 3;
        const BLINK         = 1 << 4;
        const INVERSE       = 1 << 5;
        const HIDDEN        = 1 << 6;
        const STRIKETHROUGH = 1 << 7;
    }
}

bitflags! {
    /// Cell-level flags that are orthogonal to style.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CellFlags: u8 {
        /// Leading (left) cell of a wide character.
        const WIDE_CHAR = 1 << 0;
        /// Trailing continuation of a wide character. Content is meaningless.
        const WIDE_CONTINUATION = 1 << 1;
    }
}

/// Cell color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Backend default foreground/background.
    #[default]
    Default,
    /// Named color (0-15): standard 8 + bright 8.
    Named(u8),
    /// 256-color palette index.
    Indexed(u8),
    /// 24-bit true color.
    Rgb(u8, u8, u8),
}

impl Color {
    /// Resolve to 24-bit RGB using the xterm palette, or `None` for
    /// [`Color::Default`].
    #[must_use]
    pub fn to_rgb(self) -> Option<(u8, u8, u8)> {
        match self {
            Color::Default => None,
            Color::Named(n) => Some(palette_rgb(n & 0x0F)),
            Color::Indexed(n) => Some(palette_rgb(n)),
            Color::Rgb(r, g, b) => Some((r, g, b)),
        }
    }
}

const ANSI_16: [(u8, u8, u8); 16] = [
    (0, 0, 0),
    (205, 0, 0),
    (0, 205, 0),
    (205, 205, 0),
    (0, 0, 238),
    (205, 0, 205),
    (0, 205, 205),
    (229, 229, 229),
    (127, 127, 127),
    (255, 0, 0),
    (0, 255, 0),
    (255, 255, 0),
    (92, 92, 255),
    (255, 0, 255),
    (0, 255, 255),
    (255, 255, 255),
];

/// xterm 256-color palette lookup.
fn palette_rgb(index: u8) -> (u8, u8, u8) {
    match index {
        0..=15 => ANSI_16[index as usize],
        16..=231 => {
            let i = index - 16;
            let level = |v: u8| if v == 0 { 0 } else { 55 + v * 40 };
            (level(i / 36), level((i / 6) % 6), level(i % 6))
        }
        _ => {
            let gray = 8 + (index - 232) * 10;
            (gray, gray, gray)
        }
    }
}

/// Style of a cell: flags plus foreground and background colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    pub flags: StyleFlags,
    pub fg: Color,
    pub bg: Color,
}

impl Style {
    #[must_use]
    pub const fn new(fg: Color, bg: Color) -> Self {
        Self {
            flags: StyleFlags::empty(),
            fg,
            bg,
        }
    }

    #[must_use]
    pub const fn with_flags(mut self, flags: StyleFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Reset to default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A single cell of the surface grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    content: char,
    width: u8,
    pub flags: CellFlags,
    pub style: Style,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            content: ' ',
            width: 1,
            flags: CellFlags::empty(),
            style: Style::default(),
        }
    }
}

impl Cell {
    /// Narrow cell with default style.
    #[must_use]
    pub fn new(ch: char) -> Self {
        Self {
            content: ch,
            ..Self::default()
        }
    }

    /// Narrow cell with the given style.
    #[must_use]
    pub fn styled(ch: char, style: Style) -> Self {
        Self {
            content: ch,
            style,
            ..Self::default()
        }
    }

    /// Wide (2-column) character as a `(leading, continuation)` pair.
    #[must_use]
    pub fn wide(ch: char, style: Style) -> (Self, Self) {
        let leading = Self {
            content: ch,
            width: 2,
            flags: CellFlags::WIDE_CHAR,
            style,
        };
        let continuation = Self {
            content: ' ',
            width: 0,
            flags: CellFlags::WIDE_CONTINUATION,
            style,
        };
        (leading, continuation)
    }

    #[must_use]
    pub fn content(&self) -> char {
        self.content
    }

    /// Display width in columns (0 for continuations).
    #[must_use]
    pub fn width(&self) -> u8 {
        self.width
    }

    #[must_use]
    pub fn is_wide(&self) -> bool {
        self.flags.contains(CellFlags::WIDE_CHAR)
    }

    #[must_use]
    pub fn is_wide_continuation(&self) -> bool {
        self.flags.contains(CellFlags::WIDE_CONTINUATION)
    }

    /// Blank with the given background, all other attributes reset.
    pub fn erase(&mut self, bg: Color) {
        *self = Self {
            style: Style {
                bg,
                ..Style::default()
            },
            ..Self::default()
        };
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cell_is_space() {
        let cell = Cell::default();
        assert_eq!(cell.content(), ' ');
        assert_eq!(cell.width(), 1);
        assert_eq!(cell.style, Style::default());
        assert!(!cell.is_wide());
        assert!(!cell.is_wide_continuation());
    }

    #[test]
    fn wide_char_pair() {
        let style = Style::default().with_flags(StyleFlags::BOLD);
        let (lead, cont) = Cell::wide('中', style);
        assert!(lead.is_wide());
        assert_eq!(lead.width(), 2);
        assert_eq!(lead.content(), '中');
        assert!(cont.is_wide_continuation());
        assert_eq!(cont.width(), 0);
        assert_eq!(cont.style, style);
    }

    #[test]
    fn erase_keeps_only_background() {
        let mut cell = Cell::styled(
            'X',
            Style::new(Color::Named(1), Color::Named(4)).with_flags(StyleFlags::ITALIC),
        );
        cell.erase(Color::Named(2));
        assert_eq!(cell.content(), ' ');
        assert_eq!(cell.style.flags, StyleFlags::empty());
        assert_eq!(cell.style.fg, Color::Default);
        assert_eq!(cell.style.bg, Color::Named(2));
    }

    #[test]
    fn clear_resets_everything() {
        let (mut lead, _) = Cell::wide('中', Style::new(Color::Rgb(1, 2, 3), Color::Default));
        lead.clear();
        assert_eq!(lead, Cell::default());
    }

    #[test]
    fn palette_resolution() {
        assert_eq!(Color::Default.to_rgb(), None);
        assert_eq!(Color::Named(1).to_rgb(), Some((205, 0, 0)));
        assert_eq!(Color::Indexed(16).to_rgb(), Some((0, 0, 0)));
        assert_eq!(Color::Indexed(231).to_rgb(), Some((255, 255, 255)));
        assert_eq!(Color::Indexed(232).to_rgb(), Some((8, 8, 8)));
        assert_eq!(Color::Indexed(255).to_rgb(), Some((238, 238, 238)));
        assert_eq!(Color::Rgb(10, 20, 30).to_rgb(), Some((10, 20, 30)));
    }
}
