use crate::backend::{BackendRequest, BackendVerdict, VerificationBackend};
use crate::cache::{CacheStats, RequestKey, ResultCache};
use crate::certificate::Certificate;
use crate::config::VerifierConfig;
use crate::error::{BackendError, ConfigError, VerifyError};
use crate::flags::VerifyFlags;
use crate::notifier::UsageNotifier;
use crate::result::VerificationResult;
use crate::trust_anchors::{AnchorSnapshot, Generation, TrustAnchorSet};
use logger_redacted::HostRedactor;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::{AbortHandle, JoinError, JoinHandle};
use tracing::{debug, info, instrument, warn};

/// What a caller eventually receives for one `verify` call
pub type VerifyOutcome = Result<Arc<VerificationResult>, VerifyError>;

/// Identifies one `verify` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req#{}", self.0)
    }
}

struct Waiter {
    id: RequestId,
    tx: oneshot::Sender<VerifyOutcome>,
}

/// An in-flight backend job and everyone waiting on it
struct PendingRequest {
    /// Id of the request that dispatched the job
    job: RequestId,
    waiters: Vec<Waiter>,
    abort: AbortHandle,
}

enum HandleState {
    Ready(VerifyOutcome),
    Pending(oneshot::Receiver<VerifyOutcome>),
    Taken,
}

/// Result channel for one `verify` call
///
/// Await it to get the outcome. Cache hits produce a handle that is already
/// complete; [`VerifyHandle::try_result`] takes the outcome without awaiting.
pub struct VerifyHandle {
    id: RequestId,
    key: RequestKey,
    cached: bool,
    state: HandleState,
}

impl VerifyHandle {
    fn ready(id: RequestId, key: RequestKey, outcome: VerifyOutcome) -> Self {
        Self {
            id,
            key,
            cached: true,
            state: HandleState::Ready(outcome),
        }
    }

    fn pending(id: RequestId, key: RequestKey, rx: oneshot::Receiver<VerifyOutcome>) -> Self {
        Self {
            id,
            key,
            cached: false,
            state: HandleState::Pending(rx),
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Whether the outcome was served from the result cache
    pub fn from_cache(&self) -> bool {
        self.cached
    }

    /// Trust anchor generation the request was keyed under
    pub fn generation(&self) -> Generation {
        self.key.generation
    }

    /// Take the outcome if it is already available
    pub fn try_result(&mut self) -> Option<VerifyOutcome> {
        if let HandleState::Pending(rx) = &mut self.state {
            let outcome = rx.try_recv().ok()?;
            self.state = HandleState::Taken;
            return Some(outcome);
        }
        match std::mem::replace(&mut self.state, HandleState::Taken) {
            HandleState::Ready(outcome) => Some(outcome),
            _ => None,
        }
    }
}

impl Future for VerifyHandle {
    type Output = VerifyOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let HandleState::Pending(rx) = &mut this.state {
            let received = ready!(Pin::new(rx).poll(cx));
            this.state = HandleState::Taken;
            return Poll::Ready(received.unwrap_or_else(|_| {
                Err(VerifyError::Internal("verification job ended without a result".into()))
            }));
        }
        match std::mem::replace(&mut this.state, HandleState::Taken) {
            HandleState::Ready(outcome) => Poll::Ready(outcome),
            _ => Poll::Ready(Err(VerifyError::Internal(
                "verification outcome already taken".into(),
            ))),
        }
    }
}

impl fmt::Debug for VerifyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyHandle")
            .field("id", &self.id)
            .field("generation", &self.key.generation)
            .field("from_cache", &self.from_cache())
            .finish()
    }
}

struct Inner {
    backend: Arc<dyn VerificationBackend>,
    anchors: TrustAnchorSet,
    cache: ResultCache,
    pending: Mutex<HashMap<RequestKey, PendingRequest>>,
    notifier: UsageNotifier,
    runtime: Handle,
    redactor: HostRedactor,
    notify_on_cache_hit: bool,
    next_request_id: AtomicU64,
}

/// Certificate verifier that honours policy-provided trust anchors
///
/// Wraps a [`VerificationBackend`], caches outcomes per trust anchor
/// generation, coalesces identical in-flight requests and tells a single
/// observer when a successful verification depended on an additional anchor.
///
/// State is shared across threads behind `parking_lot` locks; `verify`,
/// `cancel` and `set_trust_anchors` may be called from any thread. Backend
/// jobs and observer calls run on the tokio runtime captured at
/// construction.
pub struct PolicyCertVerifier {
    inner: Arc<Inner>,
}

impl PolicyCertVerifier {
    /// Create a verifier on the current tokio runtime
    pub fn new(
        backend: Arc<dyn VerificationBackend>,
        config: VerifierConfig,
    ) -> Result<Self, ConfigError> {
        let runtime =
            Handle::try_current().map_err(|e| ConfigError::NoRuntime(e.to_string()))?;
        Self::with_runtime(backend, config, runtime)
    }

    /// Create a verifier whose jobs run on `runtime`
    pub fn with_runtime(
        backend: Arc<dyn VerificationBackend>,
        config: VerifierConfig,
        runtime: Handle,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let notifier = UsageNotifier::spawn(&runtime);
        let redactor = logger_redacted::redactor_for(&config.logger_config());

        Ok(Self {
            inner: Arc::new(Inner {
                backend,
                anchors: TrustAnchorSet::new(),
                cache: ResultCache::new(config.cache_capacity, config.cache_ttl()),
                pending: Mutex::new(HashMap::new()),
                notifier,
                runtime,
                redactor,
                notify_on_cache_hit: config.notify_on_cache_hit,
                next_request_id: AtomicU64::new(1),
            }),
        })
    }

    /// Register the observer for additional trust anchor usage
    ///
    /// Replaces a previously registered observer. The observer always runs on
    /// the notifier task, never inside `verify` or `set_trust_anchors`.
    pub fn on_trust_anchor_used<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.notifier.set_observer(Arc::new(callback));
    }

    /// Start verifying `certificate` for `hostname`
    ///
    /// Never blocks. Malformed input is rejected here; everything else,
    /// including chain-validation failures, arrives through the handle.
    pub fn verify(
        &self,
        certificate: &Certificate,
        hostname: &str,
        flags: VerifyFlags,
        chain_hint: &[Certificate],
    ) -> Result<VerifyHandle, VerifyError> {
        validate_request(certificate, hostname)?;

        let inner = &self.inner;
        let id = RequestId(inner.next_request_id.fetch_add(1, Ordering::Relaxed));
        let snapshot = inner.anchors.current();
        let key = RequestKey::new(certificate, hostname, flags, snapshot.generation());

        let mut pending = inner.pending.lock();

        if let Some(job) = pending.get_mut(&key) {
            let (tx, rx) = oneshot::channel();
            job.waiters.push(Waiter { id, tx });
            debug!(
                request = %id,
                host = %inner.redactor.redact_host(hostname),
                waiters = job.waiters.len(),
                "Joined in-flight verification"
            );
            return Ok(VerifyHandle::pending(id, key, rx));
        }

        // Checked under the pending lock: a job stores its result before it
        // leaves the table, so a miss here means no job holds this key.
        if let Some(result) = inner.cache.get(&key) {
            drop(pending);
            debug!(
                request = %id,
                host = %inner.redactor.redact_host(hostname),
                leaf = ?key.leaf,
                generation = key.generation.0,
                "Verification served from cache"
            );
            if inner.notify_on_cache_hit {
                inner.record_usage(Some(&result));
            }
            return Ok(VerifyHandle::ready(id, key, to_outcome(result)));
        }

        let anchors_configured =
            !snapshot.is_empty() && inner.backend.supports_additional_trust_anchors();
        let request = BackendRequest {
            leaf: certificate.clone(),
            chain_hint: chain_hint.to_vec(),
            hostname: hostname.to_string(),
            flags,
            trust_anchors: snapshot,
        };

        let backend = Arc::clone(&inner.backend);
        let job: JoinHandle<Result<BackendVerdict, BackendError>> = inner
            .runtime
            .spawn(async move { backend.verify_chain(request).await });
        let abort = job.abort_handle();

        let (tx, rx) = oneshot::channel();
        pending.insert(
            key.clone(),
            PendingRequest {
                job: id,
                waiters: vec![Waiter { id, tx }],
                abort,
            },
        );
        drop(pending);

        debug!(
            request = %id,
            host = %inner.redactor.redact_host(hostname),
            leaf = ?key.leaf,
            generation = key.generation.0,
            "Dispatched verification to backend"
        );
        inner
            .runtime
            .spawn(Arc::clone(inner).finish_job(key.clone(), id, anchors_configured, job));

        Ok(VerifyHandle::pending(id, key, rx))
    }

    /// Cancel a pending request
    ///
    /// The handle resolves to [`VerifyError::Cancelled`]. When no other
    /// caller waits on the same job, the backend job is aborted and nothing
    /// is cached. Completed handles are left untouched.
    pub fn cancel(&self, handle: &VerifyHandle) {
        if handle.from_cache() {
            return;
        }

        let mut pending = self.inner.pending.lock();
        let Some(job) = pending.get_mut(&handle.key) else {
            return;
        };
        let Some(position) = job.waiters.iter().position(|w| w.id == handle.id) else {
            return;
        };

        let waiter = job.waiters.remove(position);
        let _ = waiter.tx.send(Err(VerifyError::Cancelled));

        if job.waiters.is_empty() {
            if let Some(job) = pending.remove(&handle.key) {
                job.abort.abort();
            }
            debug!(request = %handle.id, "Cancelled verification, backend job aborted");
        } else {
            debug!(request = %handle.id, "Cancelled verification");
        }
    }

    /// Replace the additional trust anchors
    ///
    /// Returns the new generation. Cached results of earlier generations stop
    /// matching, the usage latch is lowered, and jobs already handed to the
    /// backend finish with the anchors they were dispatched with. An empty
    /// list leaves only system trust.
    pub fn set_trust_anchors(&self, anchors: Vec<Certificate>) -> Generation {
        if !anchors.is_empty() && !self.inner.backend.supports_additional_trust_anchors() {
            warn!(
                anchors = anchors.len(),
                "Backend does not support additional trust anchors; they will not be reported as used"
            );
        }

        let generation = self.inner.anchors.replace(anchors);
        self.inner.notifier.reset();
        generation
    }

    /// Current anchors and their generation
    pub fn trust_anchors(&self) -> Arc<AnchorSnapshot> {
        self.inner.anchors.current()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Drop every cached result
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
        info!("Verification cache cleared");
    }

    /// Number of backend jobs in flight
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Number of times the usage observer has been invoked
    pub fn notifications_delivered(&self) -> u64 {
        self.inner.notifier.delivered()
    }
}

impl Drop for PolicyCertVerifier {
    fn drop(&mut self) {
        let jobs: Vec<PendingRequest> = self.inner.pending.lock().drain().map(|(_, job)| job).collect();
        for job in jobs {
            job.abort.abort();
            for waiter in job.waiters {
                let _ = waiter.tx.send(Err(VerifyError::Cancelled));
            }
        }
    }
}

impl Inner {
    #[instrument(skip_all, fields(job = %job_id, leaf = ?key.leaf, generation = key.generation.0))]
    async fn finish_job(
        self: Arc<Self>,
        key: RequestKey,
        job_id: RequestId,
        anchors_configured: bool,
        job: JoinHandle<Result<BackendVerdict, BackendError>>,
    ) {
        let outcome = match job.await {
            Ok(Ok(verdict)) => Ok(verdict),
            Ok(Err(err)) => {
                warn!(error = %err, "Verification backend failed");
                Err(VerifyError::from(err))
            }
            Err(err) if err.is_cancelled() => return,
            Err(err) => {
                warn!(error = %err, "Verification backend task panicked");
                Err(join_error(&err))
            }
        };
        self.complete(key, job_id, anchors_configured, outcome);
    }

    /// `anchors_configured` is whether the snapshot the job was dispatched
    /// with held any anchors the backend could use.
    fn complete(
        &self,
        key: RequestKey,
        job_id: RequestId,
        anchors_configured: bool,
        outcome: Result<BackendVerdict, VerifyError>,
    ) {
        let generation = key.generation;

        let result = outcome.map(|verdict| {
            Arc::new(VerificationResult::from_verdict(verdict, anchors_configured, generation))
        });

        // Internal failures are not cached; a retry should reach the backend
        if let Ok(result) = &result {
            if is_cacheable(result) {
                self.cache.put(key.clone(), Arc::clone(result));
            }
        }

        let job = {
            let mut pending = self.pending.lock();
            // After a cancel the same key may already belong to a newer job
            match pending.get(&key) {
                Some(entry) if entry.job == job_id => pending.remove(&key),
                _ => None,
            }
        };
        let Some(job) = job else {
            debug!("Verification finished after all callers cancelled");
            return;
        };

        let delivered = match &result {
            Ok(result) => to_outcome(Arc::clone(result)),
            Err(err) => Err(err.clone()),
        };
        debug!(
            waiters = job.waiters.len(),
            success = delivered.is_ok(),
            "Verification completed"
        );
        for waiter in job.waiters {
            let _ = waiter.tx.send(delivered.clone());
        }

        self.record_usage(result.as_deref().ok());
    }

    /// Feed a completed verification into the usage latch
    ///
    /// Results from a superseded generation count too: the caller was handed
    /// a result that relied on an anchor. Any failure lowers the latch.
    fn record_usage(&self, result: Option<&VerificationResult>) {
        let Some(result) = result else {
            self.notifier.record(false);
            return;
        };
        if self.notifier.record(result.is_anchor_dependent()) {
            info!(generation = result.generation.0, "Verification used an additional trust anchor");
        }
    }
}

fn to_outcome(result: Arc<VerificationResult>) -> VerifyOutcome {
    match result.error {
        Some(code) => Err(VerifyError::TrustValidation(code)),
        None => Ok(result),
    }
}

/// Successes and chain-validation failures are cached, per
/// [`error_common::ErrorCategory::is_cacheable`]
fn is_cacheable(result: &VerificationResult) -> bool {
    match result.error {
        Some(code) => VerifyError::TrustValidation(code).category().is_cacheable(),
        None => true,
    }
}

fn join_error(err: &JoinError) -> VerifyError {
    VerifyError::Internal(format!("verification task failed: {err}"))
}

fn validate_request(certificate: &Certificate, hostname: &str) -> Result<(), VerifyError> {
    if certificate.is_empty() {
        return Err(VerifyError::Input("leaf certificate is empty".into()));
    }
    if hostname.is_empty() {
        return Err(VerifyError::Input("hostname is empty".into()));
    }
    if hostname.chars().any(|c| c == '\0' || c.is_whitespace()) {
        return Err(VerifyError::Input("hostname contains invalid characters".into()));
    }
    Ok(())
}
