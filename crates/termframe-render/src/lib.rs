#![forbid(unsafe_code)]

//! Render-engine abstraction and frame invalidation.
//!
//! # Role in termframe
//! `termframe-render` decides what gets redrawn and when. It sits between a
//! terminal surface that keeps changing and one or more drawing backends
//! that must see each change exactly once, from a consistent snapshot.
//!
//! # Primary responsibilities
//! - **InvalidationTracker**: dirty-region accumulation shared between the
//!   producer and the render thread.
//! - **FrameController**: the per-target frame state machine with retry
//!   and full-redraw recovery.
//! - **RenderEngine**: the backend trait, plus [`EngineError`].
//! - **EngineBase**: title deduplication layered over any backend.
//! - **backend**: headless, software (ANSI) and GPU cell engines.
//!
//! # How it fits in the system
//! `termframe-runtime` owns one tracker, controller and engine base per
//! render target and ticks them from its render thread. Everything here is
//! usable standalone with a plain [`termframe_core::Surface`].

pub mod backend;
pub mod engine;
pub mod engine_base;
pub mod frame;
pub mod invalidation;

pub use engine::{EngineError, RenderEngine};
pub use engine_base::{EngineBase, TitleProposer, TitleState};
pub use frame::{FrameController, FrameOutcome, FrameReport, FrameState, PaintSummary};
pub use invalidation::{InvalidationTracker, TrackerStats};
