#![forbid(unsafe_code)]

//! Core data model for terminal render engines.
//!
//! # Role in termframe
//! `termframe-core` holds the types every other crate speaks: cell-space
//! geometry, dirty-region sets, capability flags, and the logical terminal
//! surface that producers mutate and render engines read.
//!
//! # Primary responsibilities
//! - **Geometry**: [`CellRect`] and [`GridSize`], half-open and cell-addressed.
//! - **DirtyRegion**: exact-merge rect sets with a bounded rect budget.
//! - **Surface**: cell grid, cursor, selection, and title. Every mutation
//!   reports what it changed.
//! - **EngineCaps**: what a backend can do, checked before calling it.
//!
//! # How it fits in the system
//! `termframe-render` tracks invalidation and drives frames over these types;
//! `termframe-runtime` shares a [`Surface`] between a producer and any number
//! of render targets.

pub mod caps;
pub mod cell;
pub mod geometry;
pub mod region;
pub mod surface;

pub use caps::EngineCaps;
pub use cell::{Cell, CellFlags, Color, Style, StyleFlags};
pub use geometry::{CellRect, GridSize};
pub use region::{DirtyRegion, InsertOutcome, MAX_DIRTY_RECTS};
pub use surface::{CursorShape, CursorState, RegionContent, Surface, SurfaceSource, WidthPolicy};
