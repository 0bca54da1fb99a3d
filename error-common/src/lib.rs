//! Common error codes for the policy cert verifier crates
//!
//! This crate holds the pieces of the error model that both sides of the
//! backend boundary must agree on:
//!
//! - **CertErrorCode**: the fixed set of chain-validation failure reasons,
//!   with stable numeric and string codes
//! - **ErrorCategory**: the caller-facing taxonomy (input, trust validation,
//!   cancelled, internal)
//!
//! # Example
//!
//! ```rust
//! use error_common::{CertErrorCode, ErrorCategory};
//!
//! let code = CertErrorCode::from_code(-202).unwrap();
//! assert_eq!(code, CertErrorCode::AuthorityInvalid);
//! assert!(ErrorCategory::TrustValidation.is_cacheable());
//! ```

pub mod codes;
pub mod types;

pub use codes::*;
pub use types::*;
