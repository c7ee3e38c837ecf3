//! Structured logging using tracing.
//!
//! Pretty output for development, JSON lines for log aggregation.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::MonitoringConfig;

/// Build the subscriber [`init_logging`] installs, without installing it
///
/// `RUST_LOG` takes precedence over [`MonitoringConfig::log_filter`].
pub fn build_subscriber(
    config: &MonitoringConfig,
) -> anyhow::Result<impl tracing::Subscriber + Send + Sync> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_filter)
            .with_context(|| format!("Invalid log filter '{}'", config.log_filter))?,
    };

    let json_layer = config.enable_json_logging.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });

    let pretty_layer = (!config.enable_json_logging).then(|| {
        fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });

    Ok(tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(pretty_layer))
}

/// Initialize structured logging for the whole process
///
/// Fails if the filter does not parse or a global subscriber is already set.
pub fn init_logging(config: &MonitoringConfig) -> anyhow::Result<()> {
    let subscriber = build_subscriber(config)?;

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global default subscriber")?;

    info!(
        service_name = %config.service_name,
        log_format = if config.enable_json_logging { "json" } else { "pretty" },
        "Logging initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_subscriber_for_both_formats() {
        for enable_json_logging in [false, true] {
            let config = MonitoringConfig {
                enable_json_logging,
                ..MonitoringConfig::default()
            };
            let subscriber = build_subscriber(&config).unwrap();
            tracing::subscriber::with_default(subscriber, || {
                info!(json = enable_json_logging, "subscriber works");
            });
        }
    }

    #[test]
    fn test_init_logging_only_once() {
        let config = MonitoringConfig::default();
        init_logging(&config).unwrap();
        assert!(init_logging(&config).is_err());
    }
}
