use error_common::{CertErrorCode, ErrorCategory};
use thiserror::Error;

/// Error delivered to a `verify` caller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// Malformed request, rejected before any asynchronous work began
    #[error("Invalid verification request: {0}")]
    Input(String),

    /// The backend rejected the chain
    #[error("Certificate verification failed: {0}")]
    TrustValidation(CertErrorCode),

    /// Request was cancelled before it completed
    #[error("Verification cancelled")]
    Cancelled,

    /// Backend unreachable or crashed
    #[error("Internal verification error: {0}")]
    Internal(String),
}

impl VerifyError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            VerifyError::Input(_) => ErrorCategory::Input,
            VerifyError::TrustValidation(_) => ErrorCategory::TrustValidation,
            VerifyError::Cancelled => ErrorCategory::Cancelled,
            VerifyError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// The chain-validation reason, if this is a trust failure
    pub fn cert_error(&self) -> Option<CertErrorCode> {
        match self {
            VerifyError::TrustValidation(code) => Some(*code),
            _ => None,
        }
    }
}

/// Failure of the verification backend itself (not a verdict about the chain)
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Backend error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<BackendError> for VerifyError {
    fn from(err: BackendError) -> Self {
        VerifyError::Internal(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),
}
