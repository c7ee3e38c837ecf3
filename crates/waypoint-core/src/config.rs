//! Runtime configuration.
//!
//! Values come from serde defaults and can be overridden through the
//! environment:
//!
//! | Variable | Field | Accepted values |
//! |----------|-------|-----------------|
//! | `WAYPOINT_STRICT_VALIDATION` | `validation_mode` | `1`/`true`/`yes`, `0`/`false`/`no` |
//! | `WAYPOINT_MAX_EVENTS_PER_PUMP` | `max_events_per_pump` | positive integer |
//! | `WAYPOINT_LOG_LEVEL` | `log_level` | `trace`, `debug`, `info`, `warn`, `error` |
//!
//! Unparseable values are logged and ignored.

use crate::domain::validation::ValidationMode;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Environment variable selecting strict validation
pub const STRICT_VALIDATION_ENV: &str = "WAYPOINT_STRICT_VALIDATION";

/// Environment variable bounding a single runner pump
pub const MAX_EVENTS_PER_PUMP_ENV: &str = "WAYPOINT_MAX_EVENTS_PER_PUMP";

/// Environment variable holding the default log level
pub const LOG_LEVEL_ENV: &str = "WAYPOINT_LOG_LEVEL";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

fn default_max_events_per_pump() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// How flow definitions treat validation warnings
    #[serde(default)]
    pub validation_mode: ValidationMode,

    /// Most events a runner processes in one `pump` call
    #[serde(default = "default_max_events_per_pump")]
    pub max_events_per_pump: usize,

    /// Level hosts use when no explicit log filter is configured
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            validation_mode: ValidationMode::default(),
            max_events_per_pump: default_max_events_per_pump(),
            log_level: default_log_level(),
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by the process environment
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(STRICT_VALIDATION_ENV) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => config.validation_mode = ValidationMode::Strict,
                "0" | "false" | "no" => config.validation_mode = ValidationMode::Lenient,
                other => warn!(
                    variable = STRICT_VALIDATION_ENV,
                    value = other,
                    "Ignoring unrecognised validation setting"
                ),
            }
        }

        if let Some(raw) = lookup(MAX_EVENTS_PER_PUMP_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(limit) if limit > 0 => config.max_events_per_pump = limit,
                _ => warn!(
                    variable = MAX_EVENTS_PER_PUMP_ENV,
                    value = %raw,
                    "Ignoring invalid event limit"
                ),
            }
        }

        if let Some(raw) = lookup(LOG_LEVEL_ENV) {
            let level = raw.trim().to_ascii_lowercase();
            if LOG_LEVELS.contains(&level.as_str()) {
                config.log_level = level;
            } else {
                warn!(variable = LOG_LEVEL_ENV, value = %raw, "Ignoring unknown log level");
            }
        }

        config
    }

    /// Settings for a [`FlowRunner`](crate::FlowRunner)
    pub fn runner(&self) -> RunnerConfig {
        RunnerConfig {
            max_events_per_pump: self.max_events_per_pump,
        }
    }
}

/// Per-runner settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Most events processed in one `pump` call
    pub max_events_per_pump: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RuntimeConfig::default().runner()
    }
}

impl From<&RuntimeConfig> for RunnerConfig {
    fn from(config: &RuntimeConfig) -> Self {
        config.runner()
    }
}
