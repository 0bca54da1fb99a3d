//! Logging setup for the policy cert verifier
//!
//! Installs a `tracing` subscriber and provides the hostname redactor the
//! verifier logs through. Hostnames identify the server a user is talking
//! to, so they are hashed by default; certificate fingerprints are logged in
//! a short hex form.
//!
//! # Example
//!
//! ```rust,no_run
//! use logger_redacted::{init_logging, LoggerConfig};
//!
//! let redactor = init_logging(&LoggerConfig::default())?;
//! tracing::info!(host = %redactor.redact_host("intranet.example.com"), "verifying");
//! # Ok::<(), logger_redacted::LoggingError>(())
//! ```

pub mod redactor;
pub mod subscriber;
pub mod config;

pub use redactor::*;
pub use subscriber::*;
pub use config::*;
