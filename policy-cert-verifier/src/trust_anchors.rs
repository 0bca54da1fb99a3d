use crate::certificate::{Certificate, Fingerprint};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Configuration epoch of the trust anchor set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

/// Anchors together with the generation that published them
///
/// Snapshots are never modified after publication; a replacement produces a
/// new snapshot.
#[derive(Debug)]
pub struct AnchorSnapshot {
    anchors: Arc<[Certificate]>,
    fingerprints: HashSet<Fingerprint>,
    generation: Generation,
}

impl AnchorSnapshot {
    fn new(anchors: Vec<Certificate>, generation: Generation) -> Self {
        let fingerprints = anchors.iter().map(Certificate::fingerprint).collect();
        Self {
            anchors: anchors.into(),
            fingerprints,
            generation,
        }
    }

    pub fn anchors(&self) -> &Arc<[Certificate]> {
        &self.anchors
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Whether `cert` is one of the additional anchors
    pub fn contains(&self, cert: &Certificate) -> bool {
        self.fingerprints.contains(&cert.fingerprint())
    }
}

/// The currently configured additional trust anchors
pub struct TrustAnchorSet {
    current: RwLock<Arc<AnchorSnapshot>>,
}

impl TrustAnchorSet {
    /// Empty set at generation 0
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(AnchorSnapshot::new(Vec::new(), Generation::default()))),
        }
    }

    /// Publish a new anchor list and return its generation
    ///
    /// The generation is bumped even when `anchors` equals the current list.
    pub fn replace(&self, anchors: Vec<Certificate>) -> Generation {
        let mut current = self.current.write();
        let generation = current.generation.next();
        let count = anchors.len();
        *current = Arc::new(AnchorSnapshot::new(anchors, generation));
        drop(current);

        info!(generation = generation.0, anchors = count, "Trust anchors replaced");
        generation
    }

    /// Consistent anchors/generation pair
    pub fn current(&self) -> Arc<AnchorSnapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn generation(&self) -> Generation {
        self.current.read().generation
    }
}

impl Default for TrustAnchorSet {
    fn default() -> Self {
        Self::new()
    }
}
