#![forbid(unsafe_code)]

//! Runtime configuration.
//!
//! [`RuntimeConfig`] is built with `Default` plus `with_*` builders, or read
//! from the environment with [`RuntimeConfig::from_env`]. Environment
//! overrides:
//!
//! | variable | field | format |
//! |---|---|---|
//! | `TERMFRAME_TICK_MS` | `tick_interval` | milliseconds, > 0 |
//! | `TERMFRAME_MAX_PRESENT_FAILURES` | `max_consecutive_present_failures` | integer, > 0 |
//! | `TERMFRAME_MAX_DIRTY_RECTS` | `max_dirty_rects` | integer, > 0 |
//! | `TERMFRAME_FULL_REDRAW` | `force_full_redraw` | `1/true/yes/on` or `0/false/no/off` |

use std::fmt;
use std::time::Duration;

use termframe_core::MAX_DIRTY_RECTS;

pub const ENV_TICK_MS: &str = "TERMFRAME_TICK_MS";
pub const ENV_MAX_PRESENT_FAILURES: &str = "TERMFRAME_MAX_PRESENT_FAILURES";
pub const ENV_MAX_DIRTY_RECTS: &str = "TERMFRAME_MAX_DIRTY_RECTS";
pub const ENV_FULL_REDRAW: &str = "TERMFRAME_FULL_REDRAW";

/// Configuration shared by the dispatcher and the render thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Interval between render ticks.
    pub tick_interval: Duration,
    /// Consecutive present failures after which a target is unhealthy and,
    /// if it has a factory, gets a fresh engine.
    pub max_consecutive_present_failures: u32,
    /// Rect budget for each target's invalidation tracker.
    pub max_dirty_rects: usize,
    /// Repaint the whole surface every frame.
    pub force_full_redraw: bool,
    /// Name of the render thread.
    pub thread_name: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            // ~60 Hz
            tick_interval: Duration::from_millis(16),
            max_consecutive_present_failures: 3,
            max_dirty_rects: MAX_DIRTY_RECTS,
            force_full_redraw: false,
            thread_name: "termframe-render".into(),
        }
    }
}

impl RuntimeConfig {
    /// Set the tick interval. Zero is raised to one millisecond.
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Set the unhealthy threshold. Zero is raised to one.
    #[must_use]
    pub fn with_max_consecutive_present_failures(mut self, n: u32) -> Self {
        self.max_consecutive_present_failures = n.max(1);
        self
    }

    /// Set the tracker rect budget. Zero is raised to one.
    #[must_use]
    pub fn with_max_dirty_rects(mut self, n: usize) -> Self {
        self.max_dirty_rects = n.max(1);
        self
    }

    #[must_use]
    pub fn with_force_full_redraw(mut self, enabled: bool) -> Self {
        self.force_full_redraw = enabled;
        self
    }

    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Defaults overridden through a custom environment lookup.
    pub fn from_env_with<F>(get_env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = get_env(ENV_TICK_MS) {
            let ms: u64 = parse_positive(ENV_TICK_MS, &value)?;
            config.tick_interval = Duration::from_millis(ms);
        }
        if let Some(value) = get_env(ENV_MAX_PRESENT_FAILURES) {
            config.max_consecutive_present_failures = parse_positive(ENV_MAX_PRESENT_FAILURES, &value)?;
        }
        if let Some(value) = get_env(ENV_MAX_DIRTY_RECTS) {
            config.max_dirty_rects = parse_positive(ENV_MAX_DIRTY_RECTS, &value)?;
        }
        if let Some(value) = get_env(ENV_FULL_REDRAW) {
            config.force_full_redraw = parse_flag(ENV_FULL_REDRAW, &value)?;
        }
        Ok(config)
    }
}

fn parse_positive<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + Default + PartialEq,
{
    match value.trim().parse::<T>() {
        Ok(n) if n != T::default() => Ok(n),
        Ok(_) => Err(ConfigError::invalid(var, value, "must be greater than zero")),
        Err(_) => Err(ConfigError::invalid(var, value, "expected a non-negative integer")),
    }
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(var, value, "expected a boolean flag")),
    }
}

/// Invalid runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: &'static str) -> Self {
        Self::InvalidValue {
            var,
            value: value.to_owned(),
            reason,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { var, value, reason } => {
                write!(f, "invalid {var}={value:?}: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = RuntimeConfig::from_env_with(|_| None).unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.max_dirty_rects, MAX_DIRTY_RECTS);
    }

    #[test]
    fn overrides_are_applied() {
        let config = RuntimeConfig::from_env_with(lookup(&[
            (ENV_TICK_MS, "33"),
            (ENV_MAX_PRESENT_FAILURES, " 5 "),
            (ENV_MAX_DIRTY_RECTS, "8"),
            (ENV_FULL_REDRAW, "Yes"),
        ]))
        .unwrap();
        assert_eq!(config.tick_interval, Duration::from_millis(33));
        assert_eq!(config.max_consecutive_present_failures, 5);
        assert_eq!(config.max_dirty_rects, 8);
        assert!(config.force_full_redraw);
    }

    #[test]
    fn zero_and_garbage_are_rejected() {
        let err = RuntimeConfig::from_env_with(lookup(&[(ENV_TICK_MS, "0")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid TERMFRAME_TICK_MS=\"0\": must be greater than zero"
        );
        assert!(RuntimeConfig::from_env_with(lookup(&[(ENV_MAX_DIRTY_RECTS, "-1")])).is_err());
        assert!(RuntimeConfig::from_env_with(lookup(&[(ENV_FULL_REDRAW, "maybe")])).is_err());
    }

    #[test]
    fn off_flag_values() {
        for value in ["0", "false", "NO", "off", ""] {
            let config = RuntimeConfig::from_env_with(lookup(&[(ENV_FULL_REDRAW, value)])).unwrap();
            assert!(!config.force_full_redraw, "{value:?}");
        }
    }

    #[test]
    fn builders_clamp_zero() {
        let config = RuntimeConfig::default()
            .with_tick_interval(Duration::ZERO)
            .with_max_consecutive_present_failures(0)
            .with_max_dirty_rects(0)
            .with_thread_name("tf");
        assert_eq!(config.tick_interval, Duration::from_millis(1));
        assert_eq!(config.max_consecutive_present_failures, 1);
        assert_eq!(config.max_dirty_rects, 1);
        assert_eq!(config.thread_name, "tf");
    }
}
