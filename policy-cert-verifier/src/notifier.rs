//! Trust anchor usage notification
//!
//! A latch records whether an anchor-dependent success has been signalled
//! and not yet delivered. A completion that finds the latch down raises it
//! and queues one notification; completions arriving while it is up are
//! absorbed. The delivery task lowers the latch right before it calls the
//! observer, so the next anchor-dependent completion after a delivery
//! raises a new edge. Non-anchor outcomes and anchor replacement lower the
//! latch without notifying.

use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Observer invoked when a verification relied on an additional anchor
pub type AnchorUsedCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Default)]
struct Latch {
    raised: bool,
    /// Id of the most recent rising edge
    edge: u64,
}

#[derive(Default)]
struct Shared {
    latch: Mutex<Latch>,
    observer: Mutex<Option<AnchorUsedCallback>>,
    delivered: AtomicU64,
}

pub struct UsageNotifier {
    shared: Arc<Shared>,
    tx: mpsc::UnboundedSender<u64>,
}

impl UsageNotifier {
    /// Start the delivery task on `runtime`
    ///
    /// The task ends when the notifier is dropped.
    pub fn spawn(runtime: &Handle) -> Self {
        let shared = Arc::new(Shared::default());
        let (tx, rx) = mpsc::unbounded_channel();
        runtime.spawn(deliver(Arc::clone(&shared), rx));
        Self { shared, tx }
    }

    /// Register the observer, replacing any previous one
    pub fn set_observer(&self, observer: AnchorUsedCallback) {
        *self.shared.observer.lock() = Some(observer);
    }

    /// Feed one completed verification into the latch
    ///
    /// Returns true when this completion raised a new edge.
    pub fn record(&self, anchor_dependent: bool) -> bool {
        let mut latch = self.shared.latch.lock();
        if !anchor_dependent {
            latch.raised = false;
            return false;
        }
        if latch.raised {
            return false;
        }

        latch.raised = true;
        latch.edge = latch.edge.wrapping_add(1);
        let edge = latch.edge;
        drop(latch);

        if self.tx.send(edge).is_err() {
            warn!("Trust anchor usage delivery task is gone; notification dropped");
        }
        true
    }

    /// Lower the latch after the anchor configuration changed
    pub fn reset(&self) {
        self.shared.latch.lock().raised = false;
    }

    pub fn is_raised(&self) -> bool {
        self.shared.latch.lock().raised
    }

    /// Number of observer invocations so far
    pub fn delivered(&self) -> u64 {
        self.shared.delivered.load(Ordering::Acquire)
    }
}

async fn deliver(shared: Arc<Shared>, mut rx: mpsc::UnboundedReceiver<u64>) {
    while let Some(edge) = rx.recv().await {
        {
            let mut latch = shared.latch.lock();
            // A newer edge owns the latch now; leave it raised for that one
            if latch.edge == edge {
                latch.raised = false;
            }
        }

        let observer = shared.observer.lock().clone();
        match observer {
            Some(observer) => {
                if catch_unwind(AssertUnwindSafe(|| observer())).is_err() {
                    warn!("Trust anchor usage observer panicked");
                }
                shared.delivered.fetch_add(1, Ordering::Release);
                debug!(edge, "Trust anchor usage signalled");
            }
            None => debug!(edge, "Trust anchor used, no observer registered"),
        }
    }
}
