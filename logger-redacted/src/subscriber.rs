// Global tracing subscriber setup

use crate::config::LoggerConfig;
use crate::redactor::{HostRedactor, RedactionConfig};
use thiserror::Error;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Install the global subscriber
///
/// `RUST_LOG` wins over `config.log_level` when it is set. Returns the
/// hostname redactor matching the configuration so callers log through the
/// same policy the subscriber was set up with.
pub fn init_logging(config: &LoggerConfig) -> Result<HostRedactor, LoggingError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|e| LoggingError::InvalidFilter(e.to_string()))?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if config.json {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_timer(ChronoUtc::rfc_3339()),
            )
            .try_init()
    };
    result.map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    Ok(redactor_for(config))
}

/// Redactor for a configuration, without touching the global subscriber
pub fn redactor_for(config: &LoggerConfig) -> HostRedactor {
    if config.redact_hostnames {
        HostRedactor::new(RedactionConfig::default())
    } else {
        HostRedactor::disabled()
    }
}
