#![forbid(unsafe_code)]

//! JSON log output for production hosts.
//!
//! Only compiled with the `tracing-json` feature. The filter comes from
//! `TERMFRAME_LOG` using `tracing-subscriber`'s directive syntax, e.g.
//! `TERMFRAME_LOG=termframe_render=debug,warn`.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "TERMFRAME_LOG";

const DEFAULT_DIRECTIVES: &str = "info";

/// Install a global JSON subscriber filtered by `TERMFRAME_LOG`.
///
/// Fails if a global subscriber is already set.
pub fn init_json_logging() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let directives = std::env::var(LOG_ENV).ok();
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter(directives.as_deref()))
        .with_current_span(true)
        .try_init()
}

fn env_filter(directives: Option<&str>) -> EnvFilter {
    match directives {
        Some(d) if !d.trim().is_empty() => EnvFilter::builder().parse_lossy(d),
        _ => EnvFilter::new(DEFAULT_DIRECTIVES),
    }
}
