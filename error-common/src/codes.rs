// Chain-validation error codes
// Numeric values follow the platform network stack's certificate error range.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod numeric {
    pub const COMMON_NAME_INVALID: i32 = -200;
    pub const DATE_INVALID: i32 = -201;
    pub const AUTHORITY_INVALID: i32 = -202;
    pub const UNABLE_TO_CHECK_REVOCATION: i32 = -205;
    pub const REVOKED: i32 = -206;
    pub const INVALID: i32 = -207;
    pub const WEAK_SIGNATURE_ALGORITHM: i32 = -208;
}

pub mod string {
    pub const COMMON_NAME_INVALID: &str = "CERT_5200";
    pub const DATE_INVALID: &str = "CERT_5201";
    pub const AUTHORITY_INVALID: &str = "CERT_5202";
    pub const UNABLE_TO_CHECK_REVOCATION: &str = "CERT_5205";
    pub const REVOKED: &str = "CERT_5206";
    pub const INVALID: &str = "CERT_5207";
    pub const WEAK_SIGNATURE_ALGORITHM: &str = "CERT_5208";
}

/// Reason a certificate chain failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertErrorCode {
    /// Chain does not terminate at a trusted root
    AuthorityInvalid,
    /// Certificate is expired or not yet valid
    DateInvalid,
    /// Hostname does not match the certificate's names
    CommonNameInvalid,
    /// Certificate has been revoked
    Revoked,
    /// Revocation status could not be determined
    UnableToCheckRevocation,
    /// Signed with a rejected signature algorithm
    WeakSignatureAlgorithm,
    /// Certificate is malformed or otherwise unusable
    Invalid,
}

impl CertErrorCode {
    pub const ALL: [CertErrorCode; 7] = [
        CertErrorCode::AuthorityInvalid,
        CertErrorCode::DateInvalid,
        CertErrorCode::CommonNameInvalid,
        CertErrorCode::Revoked,
        CertErrorCode::UnableToCheckRevocation,
        CertErrorCode::WeakSignatureAlgorithm,
        CertErrorCode::Invalid,
    ];

    pub fn code(self) -> i32 {
        match self {
            CertErrorCode::AuthorityInvalid => numeric::AUTHORITY_INVALID,
            CertErrorCode::DateInvalid => numeric::DATE_INVALID,
            CertErrorCode::CommonNameInvalid => numeric::COMMON_NAME_INVALID,
            CertErrorCode::Revoked => numeric::REVOKED,
            CertErrorCode::UnableToCheckRevocation => numeric::UNABLE_TO_CHECK_REVOCATION,
            CertErrorCode::WeakSignatureAlgorithm => numeric::WEAK_SIGNATURE_ALGORITHM,
            CertErrorCode::Invalid => numeric::INVALID,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CertErrorCode::AuthorityInvalid => string::AUTHORITY_INVALID,
            CertErrorCode::DateInvalid => string::DATE_INVALID,
            CertErrorCode::CommonNameInvalid => string::COMMON_NAME_INVALID,
            CertErrorCode::Revoked => string::REVOKED,
            CertErrorCode::UnableToCheckRevocation => string::UNABLE_TO_CHECK_REVOCATION,
            CertErrorCode::WeakSignatureAlgorithm => string::WEAK_SIGNATURE_ALGORITHM,
            CertErrorCode::Invalid => string::INVALID,
        }
    }

    /// Look up a code by its numeric value
    pub fn from_code(code: i32) -> Result<Self, UnknownCertErrorCode> {
        Self::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or(UnknownCertErrorCode(code))
    }

    fn description(self) -> &'static str {
        match self {
            CertErrorCode::AuthorityInvalid => "certificate authority invalid",
            CertErrorCode::DateInvalid => "certificate date invalid",
            CertErrorCode::CommonNameInvalid => "certificate name mismatch",
            CertErrorCode::Revoked => "certificate revoked",
            CertErrorCode::UnableToCheckRevocation => "unable to check revocation",
            CertErrorCode::WeakSignatureAlgorithm => "weak signature algorithm",
            CertErrorCode::Invalid => "certificate invalid",
        }
    }
}

impl fmt::Display for CertErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Unknown certificate error code: {0}")]
pub struct UnknownCertErrorCode(pub i32);
