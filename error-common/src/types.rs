use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad category of a verification failure
///
/// Every error surfaced to a verifier caller maps onto exactly one of these,
/// regardless of which crate produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Request rejected before any asynchronous work began
    Input,
    /// Backend reported a chain-validation failure
    TrustValidation,
    /// Request aborted before completion
    Cancelled,
    /// Backend unreachable or crashed
    Internal,
}

impl ErrorCategory {
    /// Whether results in this category may be stored in the result cache
    pub fn is_cacheable(self) -> bool {
        matches!(self, ErrorCategory::TrustValidation)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Input => "input",
            ErrorCategory::TrustValidation => "trust_validation",
            ErrorCategory::Cancelled => "cancelled",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(name)
    }
}
