//! Verifier configuration
//!
//! Values come from built-in defaults, an optional config file, and
//! `POLICY_CERT_VERIFIER_*` environment variables, in increasing priority.

use crate::error::ConfigError;
use config::{Config, Environment, File};
use logger_redacted::LoggerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENV_PREFIX: &str = "POLICY_CERT_VERIFIER";

/// Default number of cached verification results
pub const DEFAULT_CACHE_CAPACITY: u64 = 256;

/// Default lifetime of a cached result (30 minutes)
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 1800;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Maximum number of cached results
    pub cache_capacity: u64,
    /// Seconds a cached result stays valid
    pub cache_ttl_seconds: u64,
    /// Whether cache hits take part in usage notification
    pub notify_on_cache_hit: bool,
    #[serde(default)]
    pub logging: LoggerSettings,
}

/// Logging section, mirrored into [`LoggerConfig`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerSettings {
    pub level: String,
    pub json: bool,
    pub redact_hostnames: bool,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        let defaults = LoggerConfig::default();
        Self {
            level: defaults.log_level,
            json: defaults.json,
            redact_hostnames: defaults.redact_hostnames,
        }
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            notify_on_cache_hit: true,
            logging: LoggerSettings::default(),
        }
    }
}

impl VerifierConfig {
    /// Load from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from an optional file (any format the `config` crate detects by
    /// extension) overlaid with environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: VerifierConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid("cache_capacity must be greater than 0".into()));
        }
        if self.cache_ttl_seconds == 0 {
            return Err(ConfigError::Invalid("cache_ttl_seconds must be greater than 0".into()));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn logger_config(&self) -> LoggerConfig {
        LoggerConfig {
            log_level: self.logging.level.clone(),
            json: self.logging.json,
            redact_hostnames: self.logging.redact_hostnames,
        }
    }
}
