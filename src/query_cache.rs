use crate::core::types::ScoreEntry;
use lru::LruCache;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Identifies a cacheable search: the normalized query text plus the requested result count.
/// Distinct `top_k` values are cached separately since a smaller request is not a prefix-safe
/// substitute for a larger one once fusion and tier floors are involved (§11).
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct QueryKey {
    pub query_text: String,
    pub top_k: usize,
}

impl QueryKey {
    pub fn new(query_text: impl Into<String>, top_k: usize) -> Self {
        QueryKey { query_text: query_text.into(), top_k }
    }
}

/// Bounded LRU cache over fused, ranked results, invalidated wholesale on every mutation
/// (`index`, `delete_by_key`, `compact`) since a single stale entry is indistinguishable from a
/// correct one without re-running the query (§11).
pub struct QueryCache {
    cache: RwLock<LruCache<QueryKey, Vec<ScoreEntry>>>,
    capacity: usize,
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap();
        QueryCache {
            cache: RwLock::new(LruCache::new(cap)),
            capacity,
            hit_count: AtomicUsize::new(0),
            miss_count: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, key: &QueryKey) -> Option<Vec<ScoreEntry>> {
        let mut cache = self.cache.write();
        if let Some(results) = cache.get(key) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            Some(results.clone())
        } else {
            self.miss_count.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    pub fn put(&self, key: QueryKey, results: Vec<ScoreEntry>) {
        self.cache.write().put(key, results);
    }

    /// Drops every cached entry without resetting hit/miss counters, used after any index
    /// mutation since a cached query result may no longer reflect the live document set.
    pub fn invalidate(&self) {
        self.cache.write().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            size: self.cache.read().len(),
            capacity: self.capacity,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hit_count: usize,
    pub miss_count: usize,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DocId;

    #[test]
    fn put_then_get_is_a_hit_and_miss_otherwise() {
        let cache = QueryCache::new(4);
        let key = QueryKey::new("fox", 10);
        assert!(cache.get(&key).is_none());

        cache.put(key.clone(), vec![ScoreEntry::new(1.0, DocId(0), 0, None)]);
        let hit = cache.get(&key).unwrap();
        assert_eq!(hit.len(), 1);

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
    }

    #[test]
    fn invalidate_clears_all_entries() {
        let cache = QueryCache::new(4);
        cache.put(QueryKey::new("fox", 10), vec![]);
        cache.invalidate();
        assert!(cache.get(&QueryKey::new("fox", 10)).is_none());
    }

    #[test]
    fn distinct_top_k_values_are_distinct_keys() {
        let cache = QueryCache::new(4);
        cache.put(QueryKey::new("fox", 10), vec![ScoreEntry::new(1.0, DocId(0), 0, None)]);
        assert!(cache.get(&QueryKey::new("fox", 20)).is_none());
    }
}
