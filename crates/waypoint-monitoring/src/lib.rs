//! Logging bootstrap for hosts embedding the Waypoint engine
//!
//! The engine crates only emit `tracing` events. A host that wants to see
//! them calls [`init_logging`] once at startup, usually with
//! [`MonitoringConfig::from_env`].

use serde::{Deserialize, Serialize};
use std::env;

pub mod logging;

pub use logging::{build_subscriber, init_logging};

/// Filter directives, e.g. `info,waypoint_core=debug`
pub const LOG_FILTER_ENV: &str = "WAYPOINT_LOG_FILTER";
/// `true`/`1` switches to JSON lines
pub const LOG_JSON_ENV: &str = "WAYPOINT_LOG_JSON";
/// Name stamped on the startup log line
pub const SERVICE_NAME_ENV: &str = "WAYPOINT_SERVICE_NAME";

/// Configuration for initializing logging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Service name used in the startup log line
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Log level filter, used when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// JSON output for log aggregation instead of human-readable lines
    #[serde(default)]
    pub enable_json_logging: bool,
}

fn default_service_name() -> String {
    "waypoint".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            log_filter: default_log_filter(),
            enable_json_logging: false,
        }
    }
}

impl MonitoringConfig {
    /// Defaults overridden by the `WAYPOINT_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            service_name: lookup(SERVICE_NAME_ENV)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.service_name),
            log_filter: lookup(LOG_FILTER_ENV)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.log_filter),
            enable_json_logging: lookup(LOG_JSON_ENV)
                .map(|v| {
                    matches!(
                        v.trim().to_ascii_lowercase().as_str(),
                        "1" | "true" | "yes" | "on"
                    )
                })
                .unwrap_or(defaults.enable_json_logging),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_config_defaults() {
        let config = MonitoringConfig::default();
        assert_eq!(config.service_name, "waypoint");
        assert_eq!(config.log_filter, "info");
        assert!(!config.enable_json_logging);
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (SERVICE_NAME_ENV, "payroll-host"),
            (LOG_FILTER_ENV, "warn,waypoint_core=debug"),
            (LOG_JSON_ENV, "TRUE"),
        ]
        .into_iter()
        .collect();

        let config = MonitoringConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(
            config,
            MonitoringConfig {
                service_name: "payroll-host".to_string(),
                log_filter: "warn,waypoint_core=debug".to_string(),
                enable_json_logging: true,
            }
        );
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let config = MonitoringConfig::from_lookup(|key| match key {
            SERVICE_NAME_ENV => Some("  ".to_string()),
            LOG_JSON_ENV => Some("nope".to_string()),
            _ => None,
        });
        assert_eq!(config, MonitoringConfig::default());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: MonitoringConfig =
            serde_json::from_str(r#"{"enable_json_logging": true}"#).unwrap();
        assert_eq!(config.service_name, "waypoint");
        assert!(config.enable_json_logging);
    }
}
