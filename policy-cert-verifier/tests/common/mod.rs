//! Shared fixtures for the verifier integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use policy_cert_verifier::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

pub const TEST_HOST: &str = "127.0.0.1";

/// Static backend that counts calls and can hold jobs until released
pub struct CountingBackend {
    pub inner: StaticTrustBackend,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
    fail_internal: AtomicBool,
    panic_on_call: AtomicBool,
    supports_anchors: bool,
}

impl CountingBackend {
    pub fn new() -> Self {
        Self {
            inner: StaticTrustBackend::new(),
            calls: AtomicUsize::new(0),
            gate: None,
            fail_internal: AtomicBool::new(false),
            panic_on_call: AtomicBool::new(false),
            supports_anchors: true,
        }
    }

    /// Jobs block until `release` hands out permits
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::new()
        }
    }

    pub fn without_anchor_support() -> Self {
        Self {
            supports_anchors: false,
            ..Self::new()
        }
    }

    pub fn release(&self, jobs: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(jobs);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_fail_internal(&self, fail: bool) {
        self.fail_internal.store(fail, Ordering::SeqCst);
    }

    pub fn set_panic(&self, panic: bool) {
        self.panic_on_call.store(panic, Ordering::SeqCst);
    }
}

#[async_trait]
impl VerificationBackend for CountingBackend {
    async fn verify_chain(&self, request: BackendRequest) -> Result<BackendVerdict, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| BackendError::Unavailable(e.to_string()))?;
            permit.forget();
        }

        if self.panic_on_call.load(Ordering::SeqCst) {
            panic!("backend crashed");
        }
        if self.fail_internal.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("trust store unavailable".into()));
        }
        self.inner.verify_chain(request).await
    }

    fn supports_additional_trust_anchors(&self) -> bool {
        self.supports_anchors
    }
}

/// Records observer invocations
pub struct AnchorObserver {
    rx: mpsc::UnboundedReceiver<()>,
}

impl AnchorObserver {
    pub fn attach(verifier: &PolicyCertVerifier) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        verifier.on_trust_anchor_used(move || {
            let _ = tx.send(());
        });
        Self { rx }
    }

    /// Whether the observer fired since the last call, draining all signals
    pub async fn was_trust_anchor_used_and_reset(&mut self) -> bool {
        let fired = tokio::time::timeout(Duration::from_millis(200), self.rx.recv())
            .await
            .is_ok();
        while self.rx.try_recv().is_ok() {}
        fired
    }

    /// Number of signals received within a short window
    pub async fn count(&mut self) -> usize {
        let mut count = 0;
        while tokio::time::timeout(Duration::from_millis(200), self.rx.recv())
            .await
            .is_ok()
        {
            count += 1;
        }
        count
    }
}

/// CA and the server certificate it issued, neither trusted by default
pub struct TestPki {
    pub ca: Certificate,
    pub server: Certificate,
}

impl TestPki {
    pub fn new(backend: &CountingBackend) -> Self {
        let ca = Certificate::from_der(b"test root ca".to_vec());
        let server = Certificate::from_der(b"test server 127.0.0.1".to_vec());
        backend.inner.add_issuer(&server, &ca);
        Self { ca, server }
    }
}

pub fn verifier_with(backend: Arc<CountingBackend>) -> PolicyCertVerifier {
    verifier_with_config(backend, VerifierConfig::default())
}

pub fn verifier_with_config(backend: Arc<CountingBackend>, config: VerifierConfig) -> PolicyCertVerifier {
    PolicyCertVerifier::new(backend, config).unwrap()
}

/// Yield until the backend has been entered `calls` times
pub async fn wait_for_calls(backend: &CountingBackend, calls: usize) {
    for _ in 0..1000 {
        if backend.calls() >= calls {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("backend was called {} times, expected {}", backend.calls(), calls);
}
