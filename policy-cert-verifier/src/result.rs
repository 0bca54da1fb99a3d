use crate::backend::BackendVerdict;
use crate::certificate::{Certificate, PublicKeyHash};
use crate::trust_anchors::Generation;
use chrono::{DateTime, Utc};
use error_common::CertErrorCode;

/// Outcome of one chain verification
///
/// Failed verifications keep whatever chain the backend managed to build, so
/// they can be cached and inspected like successes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub error: Option<CertErrorCode>,
    pub verified_chain: Vec<Certificate>,
    pub public_key_hashes: Vec<PublicKeyHash>,
    pub is_issued_by_known_root: bool,
    pub used_additional_anchor: bool,
    /// Trust anchor generation the backend was called with
    pub generation: Generation,
    pub verified_at: DateTime<Utc>,
}

impl VerificationResult {
    /// Build a result from a backend verdict
    ///
    /// `anchors_configured` is whether the anchor snapshot used for the job
    /// was non-empty; without anchors the usage flag is always false.
    pub(crate) fn from_verdict(
        verdict: BackendVerdict,
        anchors_configured: bool,
        generation: Generation,
    ) -> Self {
        let used_additional_anchor =
            verdict.error.is_none() && anchors_configured && verdict.used_additional_anchor;

        Self {
            error: verdict.error,
            verified_chain: verdict.verified_chain,
            public_key_hashes: verdict.public_key_hashes,
            is_issued_by_known_root: verdict.is_issued_by_known_root,
            used_additional_anchor,
            generation,
            verified_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// A success that depended on an administrator-provided anchor
    pub fn is_anchor_dependent(&self) -> bool {
        self.is_success() && self.used_additional_anchor
    }
}
