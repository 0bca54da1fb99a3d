//! Verification result cache

use crate::certificate::{Certificate, Fingerprint};
use crate::flags::VerifyFlags;
use crate::result::VerificationResult;
use crate::trust_anchors::Generation;
use moka::sync::Cache;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Identity of a verification request
///
/// The trust anchor generation is part of the key, so results computed under
/// a previous anchor configuration can never be looked up again.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub leaf: Fingerprint,
    pub hostname: String,
    pub flags: VerifyFlags,
    pub generation: Generation,
}

impl RequestKey {
    pub fn new(leaf: &Certificate, hostname: &str, flags: VerifyFlags, generation: Generation) -> Self {
        Self {
            leaf: leaf.fingerprint(),
            hostname: hostname.to_string(),
            flags,
            generation,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
}

/// Bounded, expiring map from request key to result
pub struct ResultCache {
    cache: Cache<RequestKey, Arc<VerificationResult>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self {
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &RequestKey) -> Option<Arc<VerificationResult>> {
        let found = self.cache.get(key);
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub fn put(&self, key: RequestKey, result: Arc<VerificationResult>) {
        self.cache.insert(key, result);
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.run_pending_tasks();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.entry_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendVerdict;

    fn result(generation: Generation) -> Arc<VerificationResult> {
        let leaf = Certificate::from_der(b"leaf".to_vec());
        Arc::new(VerificationResult::from_verdict(
            BackendVerdict::trusted(vec![leaf], false),
            false,
            generation,
        ))
    }

    fn key(host: &str, generation: Generation) -> RequestKey {
        RequestKey::new(
            &Certificate::from_der(b"leaf".to_vec()),
            host,
            VerifyFlags::empty(),
            generation,
        )
    }

    #[test]
    fn test_hit_and_miss() {
        let cache = ResultCache::new(16, Duration::from_secs(60));
        assert!(cache.get(&key("a.example", Generation(0))).is_none());

        cache.put(key("a.example", Generation(0)), result(Generation(0)));
        assert!(cache.get(&key("a.example", Generation(0))).is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_generation_is_part_of_key() {
        let cache = ResultCache::new(16, Duration::from_secs(60));
        cache.put(key("a.example", Generation(1)), result(Generation(1)));

        assert!(cache.get(&key("a.example", Generation(2))).is_none());
        assert!(cache.get(&key("a.example", Generation(0))).is_none());
        assert!(cache.get(&key("a.example", Generation(1))).is_some());
    }

    #[test]
    fn test_flags_and_hostname_are_part_of_key() {
        let cache = ResultCache::new(16, Duration::from_secs(60));
        cache.put(key("a.example", Generation(0)), result(Generation(0)));

        let mut flagged = key("a.example", Generation(0));
        flagged.flags = VerifyFlags::ENABLE_REV_CHECKING;
        assert!(cache.get(&flagged).is_none());
        assert!(cache.get(&key("b.example", Generation(0))).is_none());
    }

    #[test]
    fn test_clear() {
        let cache = ResultCache::new(16, Duration::from_secs(60));
        cache.put(key("a.example", Generation(0)), result(Generation(0)));
        cache.clear();
        assert!(cache.get(&key("a.example", Generation(0))).is_none());
    }

    #[test]
    fn test_capacity_is_bounded() {
        let cache = ResultCache::new(4, Duration::from_secs(60));
        for i in 0..64 {
            cache.put(key(&format!("host{i}.example"), Generation(0)), result(Generation(0)));
        }
        assert!(cache.stats().entries <= 4);
    }
}
