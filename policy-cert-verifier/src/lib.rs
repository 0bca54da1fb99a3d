//! Asynchronous X.509 verification with policy-provided trust anchors
//!
//! This crate wraps a platform chain verification engine and adds:
//! - Additional trust anchors (administrator-pinned CAs) that can be swapped
//!   at any time without blocking verification
//! - A result cache keyed by the trust anchor generation, so results never
//!   leak across anchor configurations
//! - Coalescing of identical in-flight requests and cancellation
//! - An observer that is told when a successful verification depended on an
//!   additional anchor instead of system trust
//!
//! # Core Concepts
//!
//! - **Backend**: the engine that actually builds and checks chains
//!   ([`VerificationBackend`])
//! - **Trust anchor set**: the extra roots, replaced wholesale; each
//!   replacement starts a new [`Generation`]
//! - **Handle**: what `verify` returns; await it for the outcome
//!
//! # Example
//!
//! ```rust
//! use policy_cert_verifier::{
//!     Certificate, PolicyCertVerifier, StaticTrustBackend, VerifierConfig, VerifyFlags,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let root = Certificate::from_der(b"root".to_vec());
//!     let leaf = Certificate::from_der(b"leaf".to_vec());
//!
//!     let backend = Arc::new(StaticTrustBackend::new());
//!     backend.add_issuer(&leaf, &root);
//!
//!     let verifier = PolicyCertVerifier::new(backend, VerifierConfig::default())?;
//!     verifier.on_trust_anchor_used(|| println!("policy-provided CA in use"));
//!     verifier.set_trust_anchors(vec![root]);
//!
//!     let result = verifier
//!         .verify(&leaf, "intranet.example.com", VerifyFlags::empty(), &[])?
//!         .await?;
//!     assert!(result.used_additional_anchor);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cache;
pub mod certificate;
pub mod config;
pub mod error;
pub mod flags;
pub mod notifier;
pub mod result;
pub mod trust_anchors;
pub mod verifier;

pub use backend::*;
pub use cache::{CacheStats, RequestKey};
pub use certificate::*;
pub use config::VerifierConfig;
pub use error::*;
pub use flags::VerifyFlags;
pub use notifier::AnchorUsedCallback;
pub use result::VerificationResult;
pub use trust_anchors::{AnchorSnapshot, Generation};
pub use verifier::*;

pub use error_common::{CertErrorCode, ErrorCategory};
pub use logger_redacted::{init_logging, LoggerConfig};
