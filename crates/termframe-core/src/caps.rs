//! Render engine capability flags.
//!
//! Engines advertise what they support so the frame controller and the
//! dispatcher can skip unsupported operations up front instead of relying
//! on failures.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EngineCaps: u16 {
        /// Wants `invalidate` before each region is painted.
        const INVALIDATE      = 1 << 0;
        /// Applies window/tab titles.
        const TITLE           = 1 << 1;
        /// Draws the cursor.
        const CURSOR          = 1 << 2;
        /// Draws the selection highlight.
        const SELECTION       = 1 << 3;
        /// Keeps the previous frame's contents, so painting only dirty
        /// regions is valid. Without it every frame repaints everything.
        const PARTIAL_PRESENT = 1 << 4;
        /// No visible output (tests, measurement, diagnostics mirrors).
        const HEADLESS        = 1 << 5;
    }
}

impl EngineCaps {
    /// Flags shared by engines that draw a full terminal surface.
    pub const SURFACE: Self = Self::TITLE
        .union(Self::CURSOR)
        .union(Self::SELECTION)
        .union(Self::PARTIAL_PRESENT);

    /// Short lowercase names of the set flags, for logs.
    #[must_use]
    pub fn labels(self) -> Vec<&'static str> {
        self.iter_names()
            .map(|(name, _)| match name {
                "INVALIDATE" => "invalidate",
                "TITLE" => "title",
                "CURSOR" => "cursor",
                "SELECTION" => "selection",
                "PARTIAL_PRESENT" => "partial-present",
                "HEADLESS" => "headless",
                other => other,
            })
            .collect()
    }
}
