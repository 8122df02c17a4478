#![forbid(unsafe_code)]

//! Runtime glue between a terminal producer and its render backends.
//!
//! # Role in termframe
//! `termframe-runtime` is what a terminal host links against. It owns the
//! shared surface the parser writes into and drives every attached
//! backend from a dedicated render thread.
//!
//! # Primary responsibilities
//! - **SharedSurface**: producer-side mutations that mark every subscribed
//!   target dirty after the surface lock is released.
//! - **RenderTarget**: one engine with its own tracker and frame controller.
//! - **Dispatcher**: fan-out to several targets, failure reporting and
//!   engine replacement.
//! - **RenderThread**: fixed-rate ticking, command queue and shutdown.
//! - **RuntimeConfig**: defaults, builders and environment overrides.
//!
//! # How it fits in the system
//! Geometry and the surface model come from `termframe-core`; trackers,
//! frame controllers and backends come from `termframe-render`. This crate
//! only wires them together and adds no drawing logic of its own.
//!
//! # Example
//!
//! ```
//! use termframe_core::{GridSize, Style};
//! use termframe_render::backend::headless::HeadlessEngine;
//! use termframe_runtime::{Dispatcher, RuntimeConfig, SharedEngine, SharedSurface};
//!
//! let size = GridSize::new(20, 2);
//! let surface = SharedSurface::new(size);
//! let mirror = SharedEngine::new(HeadlessEngine::new(size));
//!
//! let mut dispatcher = Dispatcher::new(surface.clone(), RuntimeConfig::default());
//! dispatcher.add_target(mirror.clone());
//!
//! surface.write_text(0, 0, "$ ls", Style::default());
//! surface.propose_title("shell");
//! assert!(dispatcher.tick().is_empty());
//!
//! assert_eq!(mirror.lock().presented_text(0), "$ ls");
//! assert_eq!(mirror.lock().title(), "shell");
//! ```

pub mod config;
pub mod dispatcher;
#[cfg(feature = "tracing-json")]
pub mod logging;
pub mod render_thread;
pub mod shared_engine;
pub mod surface;
pub mod target;

pub use config::{ConfigError, RuntimeConfig};
pub use dispatcher::{DispatchEvent, Dispatcher, DynEngine, EngineFactory, TargetId};
pub use render_thread::{RenderCmd, RenderThread};
pub use shared_engine::SharedEngine;
pub use surface::{SharedSurface, SubscriptionId};
pub use target::RenderTarget;
pub use termframe_render::{EngineError, RenderEngine};
