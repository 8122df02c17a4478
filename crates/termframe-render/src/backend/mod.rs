//! Concrete render engines.
//!
//! - [`headless::HeadlessEngine`]: in-memory grid with call recording and
//!   fault injection.
//! - [`software::SoftwareEngine`]: ANSI output over any `Write`.
//! - [`gpu::GpuEngine`]: instanced cell uploads over a [`gpu::GpuSurface`].

pub mod gpu;
pub mod headless;
pub mod software;

pub use gpu::{CellData, CellPatch, GpuEngine, GpuSurface, MemoryGpuSurface};
pub use headless::{DrawCall, HeadlessEngine};
pub use software::SoftwareEngine;
