//! Verification backend capability
//!
//! The verifier never builds or checks chains itself. Everything that touches
//! signatures, validity periods, revocation or the system trust store lives
//! behind [`VerificationBackend`].

use crate::certificate::{Certificate, Fingerprint, PublicKeyHash};
use crate::error::BackendError;
use crate::flags::VerifyFlags;
use crate::trust_anchors::AnchorSnapshot;
use async_trait::async_trait;
use error_common::CertErrorCode;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Everything the backend needs for one chain verification
#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub leaf: Certificate,
    pub chain_hint: Vec<Certificate>,
    pub hostname: String,
    pub flags: VerifyFlags,
    /// Snapshot captured when the request was dispatched
    pub trust_anchors: Arc<AnchorSnapshot>,
}

/// Backend outcome for a chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendVerdict {
    /// `None` when the chain is valid
    pub error: Option<CertErrorCode>,
    pub verified_chain: Vec<Certificate>,
    pub public_key_hashes: Vec<PublicKeyHash>,
    pub is_issued_by_known_root: bool,
    /// The chain terminated at one of `BackendRequest::trust_anchors`
    pub used_additional_anchor: bool,
}

impl BackendVerdict {
    pub fn trusted(verified_chain: Vec<Certificate>, used_additional_anchor: bool) -> Self {
        let public_key_hashes = verified_chain.iter().map(Certificate::fingerprint).collect();
        Self {
            error: None,
            verified_chain,
            public_key_hashes,
            is_issued_by_known_root: !used_additional_anchor,
            used_additional_anchor,
        }
    }

    pub fn failed(error: CertErrorCode, verified_chain: Vec<Certificate>) -> Self {
        Self {
            error: Some(error),
            verified_chain,
            public_key_hashes: Vec::new(),
            is_issued_by_known_root: false,
            used_additional_anchor: false,
        }
    }
}

/// Platform chain verification engine
///
/// Implementations must set `used_additional_anchor` if and only if the
/// validated chain terminates at a certificate from the request's anchor
/// snapshot rather than at a system root. The verifier relies on this flag
/// alone to decide whether to notify.
#[async_trait]
pub trait VerificationBackend: Send + Sync {
    async fn verify_chain(&self, request: BackendRequest) -> Result<BackendVerdict, BackendError>;

    /// Whether `BackendRequest::trust_anchors` is honoured at all
    fn supports_additional_trust_anchors(&self) -> bool {
        true
    }
}

const MAX_CHAIN_DEPTH: usize = 16;

/// In-memory backend with an explicit issuer graph and system root list
///
/// Useful for embedding and tests: "signatures" are issuer links registered
/// with [`StaticTrustBackend::add_issuer`], the system store is a set of
/// fingerprints that can be modified at runtime. Public key hashes are taken
/// over each certificate's full encoding.
#[derive(Default)]
pub struct StaticTrustBackend {
    state: RwLock<StaticTrustState>,
}

#[derive(Default)]
struct StaticTrustState {
    system_roots: HashSet<Fingerprint>,
    issuers: HashMap<Fingerprint, Certificate>,
    names: HashMap<Fingerprint, Vec<String>>,
    failures: HashMap<Fingerprint, CertErrorCode>,
}

impl StaticTrustBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust `root` in the system store
    pub fn trust_system_root(&self, root: &Certificate) {
        self.state.write().system_roots.insert(root.fingerprint());
    }

    pub fn distrust_system_root(&self, root: &Certificate) {
        self.state.write().system_roots.remove(&root.fingerprint());
    }

    /// Record that `issuer` signed `subject`
    pub fn add_issuer(&self, subject: &Certificate, issuer: &Certificate) {
        self.state
            .write()
            .issuers
            .insert(subject.fingerprint(), issuer.clone());
    }

    /// Names `leaf` is valid for; leaves without names accept any hostname
    pub fn set_names(&self, leaf: &Certificate, names: &[&str]) {
        self.state.write().names.insert(
            leaf.fingerprint(),
            names.iter().map(|n| n.to_ascii_lowercase()).collect(),
        );
    }

    /// Force `leaf` to fail with `error` once its chain is built
    pub fn set_failure(&self, leaf: &Certificate, error: CertErrorCode) {
        self.state.write().failures.insert(leaf.fingerprint(), error);
    }

    pub fn clear_failure(&self, leaf: &Certificate) {
        self.state.write().failures.remove(&leaf.fingerprint());
    }

    fn evaluate(&self, request: &BackendRequest) -> BackendVerdict {
        let state = self.state.read();
        let mut chain = vec![request.leaf.clone()];
        let mut current = request.leaf.clone();

        let anchored = loop {
            // System trust wins over an additional anchor for the same certificate
            if state.system_roots.contains(&current.fingerprint()) {
                break Some(false);
            }
            if request.trust_anchors.contains(&current) {
                break Some(true);
            }
            if chain.len() >= MAX_CHAIN_DEPTH {
                break None;
            }
            match state.issuers.get(&current.fingerprint()) {
                Some(issuer) if !chain.contains(issuer) => {
                    chain.push(issuer.clone());
                    current = issuer.clone();
                }
                _ => break None,
            }
        };

        if let Some(error) = state.failures.get(&request.leaf.fingerprint()) {
            return BackendVerdict::failed(*error, chain);
        }

        if let Some(names) = state.names.get(&request.leaf.fingerprint()) {
            let host = request.hostname.to_ascii_lowercase();
            if !names.iter().any(|n| *n == host) {
                return BackendVerdict::failed(CertErrorCode::CommonNameInvalid, chain);
            }
        }

        match anchored {
            Some(used_additional_anchor) => BackendVerdict::trusted(chain, used_additional_anchor),
            None => BackendVerdict::failed(CertErrorCode::AuthorityInvalid, chain),
        }
    }
}

#[async_trait]
impl VerificationBackend for StaticTrustBackend {
    async fn verify_chain(&self, request: BackendRequest) -> Result<BackendVerdict, BackendError> {
        Ok(self.evaluate(&request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trust_anchors::TrustAnchorSet;

    fn cert(name: &str) -> Certificate {
        Certificate::from_der(name.as_bytes().to_vec())
    }

    fn request(leaf: &Certificate, anchors: &TrustAnchorSet) -> BackendRequest {
        BackendRequest {
            leaf: leaf.clone(),
            chain_hint: Vec::new(),
            hostname: "127.0.0.1".to_string(),
            flags: VerifyFlags::empty(),
            trust_anchors: anchors.current(),
        }
    }

    #[tokio::test]
    async fn test_untrusted_chain_is_authority_invalid() {
        let backend = StaticTrustBackend::new();
        let (root, leaf) = (cert("root"), cert("leaf"));
        backend.add_issuer(&leaf, &root);

        let verdict = backend.verify_chain(request(&leaf, &TrustAnchorSet::new())).await.unwrap();
        assert_eq!(verdict.error, Some(CertErrorCode::AuthorityInvalid));
        assert_eq!(verdict.verified_chain, vec![leaf, root]);
        assert!(!verdict.used_additional_anchor);
    }

    #[tokio::test]
    async fn test_additional_anchor_terminates_chain() {
        let backend = StaticTrustBackend::new();
        let (root, intermediate, leaf) = (cert("root"), cert("intermediate"), cert("leaf"));
        backend.add_issuer(&leaf, &intermediate);
        backend.add_issuer(&intermediate, &root);

        let anchors = TrustAnchorSet::new();
        anchors.replace(vec![root.clone()]);

        let verdict = backend.verify_chain(request(&leaf, &anchors)).await.unwrap();
        assert_eq!(verdict.error, None);
        assert!(verdict.used_additional_anchor);
        assert!(!verdict.is_issued_by_known_root);
        assert_eq!(verdict.verified_chain.len(), 3);
        assert_eq!(verdict.public_key_hashes.len(), 3);
    }

    #[tokio::test]
    async fn test_system_root_takes_precedence() {
        let backend = StaticTrustBackend::new();
        let (root, leaf) = (cert("root"), cert("leaf"));
        backend.add_issuer(&leaf, &root);
        backend.trust_system_root(&root);

        let anchors = TrustAnchorSet::new();
        anchors.replace(vec![root]);

        let verdict = backend.verify_chain(request(&leaf, &anchors)).await.unwrap();
        assert_eq!(verdict.error, None);
        assert!(!verdict.used_additional_anchor);
        assert!(verdict.is_issued_by_known_root);
    }

    #[tokio::test]
    async fn test_name_mismatch_and_forced_failure() {
        let backend = StaticTrustBackend::new();
        let (root, leaf) = (cert("root"), cert("leaf"));
        backend.add_issuer(&leaf, &root);
        backend.trust_system_root(&root);
        backend.set_names(&leaf, &["intranet.example.com"]);

        let verdict = backend.verify_chain(request(&leaf, &TrustAnchorSet::new())).await.unwrap();
        assert_eq!(verdict.error, Some(CertErrorCode::CommonNameInvalid));

        backend.set_failure(&leaf, CertErrorCode::DateInvalid);
        let verdict = backend.verify_chain(request(&leaf, &TrustAnchorSet::new())).await.unwrap();
        assert_eq!(verdict.error, Some(CertErrorCode::DateInvalid));
    }

    #[tokio::test]
    async fn test_issuer_cycle_terminates() {
        let backend = StaticTrustBackend::new();
        let (a, b) = (cert("a"), cert("b"));
        backend.add_issuer(&a, &b);
        backend.add_issuer(&b, &a);

        let verdict = backend.verify_chain(request(&a, &TrustAnchorSet::new())).await.unwrap();
        assert_eq!(verdict.error, Some(CertErrorCode::AuthorityInvalid));
        assert_eq!(verdict.verified_chain.len(), 2);
    }
}
