//! Fingerprinted memo of recent search results.
//!
//! The fingerprint is order-independent: sorted significant query terms
//! plus normalized location plus the sorted source list, hashed. The
//! cache is read-through only in the sense that a miss never populates
//! itself; the orchestrator explicitly `set`s after a successful search.
//!
//! Eviction is LRU with a TTL: expired entries are removed on read, and
//! once `max_entries` is exceeded the entry with the oldest
//! `last_accessed` goes first, ties broken by lowest hit count.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::query::significant_terms;
use crate::types::result::SearchResult;

/// Cache tuning.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an entry stays servable.
    pub ttl: Duration,

    /// Entry count that triggers eviction.
    pub max_entries: usize,

    /// How many significant query terms participate in the fingerprint.
    pub fingerprint_terms: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(15 * 60),
            max_entries: 100,
            fingerprint_terms: 8,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: SearchResult,
    stored_at: Instant,
    last_accessed: Instant,
    hit_count: u64,
    size: usize,
}

/// LRU+TTL store of recent search results, shared by `Arc`.
#[derive(Debug)]
pub struct SearchCache {
    config: CacheConfig,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl Default for SearchCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchCache {
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Normalized, order-independent cache key for a search.
    pub fn fingerprint(&self, query: &str, location: Option<&str>, sources: &[String]) -> String {
        let mut terms = significant_terms(query);
        terms.truncate(self.config.fingerprint_terms);

        let location = location
            .map(|l| l.trim().to_lowercase())
            .unwrap_or_default();

        let mut sorted_sources: Vec<&str> = sources.iter().map(String::as_str).collect();
        sorted_sources.sort_unstable();

        let mut hasher = Sha256::new();
        hasher.update(terms.join("|"));
        hasher.update("\0");
        hasher.update(&location);
        hasher.update("\0");
        hasher.update(sorted_sources.join("|"));
        format!("{:x}", hasher.finalize())
    }

    /// Fetch a live entry, refreshing its access metadata. Expired
    /// entries are removed and reported as a miss.
    pub fn get(&self, fingerprint: &str) -> Option<SearchResult> {
        let mut entries = self.entries.lock().unwrap();

        let expired = entries
            .get(fingerprint)
            .map(|e| e.stored_at.elapsed() >= self.config.ttl)
            .unwrap_or(false);
        if expired {
            entries.remove(fingerprint);
            debug!(fingerprint, "cache entry expired");
            return None;
        }

        entries.get_mut(fingerprint).map(|entry| {
            entry.last_accessed = Instant::now();
            entry.hit_count += 1;
            debug!(fingerprint, hits = entry.hit_count, "cache hit");
            entry.payload.clone()
        })
    }

    /// Store a result, evicting least-recently-used entries as needed.
    pub fn set(&self, fingerprint: impl Into<String>, payload: SearchResult) {
        let size = serde_json::to_vec(&payload).map(|v| v.len()).unwrap_or(0);
        let now = Instant::now();

        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            fingerprint.into(),
            CacheEntry {
                payload,
                stored_at: now,
                last_accessed: now,
                hit_count: 0,
                size,
            },
        );

        while entries.len() > self.config.max_entries {
            let victim = entries
                .iter()
                .min_by_key(|(_, e)| (e.last_accessed, e.hit_count))
                .map(|(k, _)| k.clone());
            match victim {
                Some(key) => {
                    debug!(fingerprint = %key, "evicting least-recently-used entry");
                    entries.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Approximate serialized size of all cached payloads, in bytes.
    pub fn total_size(&self) -> usize {
        self.entries.lock().unwrap().values().map(|e| e.size).sum()
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::result::{SearchMetadata, ServiceStatus};
    use uuid::Uuid;

    fn empty_result() -> SearchResult {
        SearchResult {
            candidates: vec![],
            metadata: SearchMetadata {
                search_id: Uuid::new_v4(),
                original_count: 0,
                deduplicated_count: 0,
                duplicates_found: 0,
                sources_used: vec![],
                errors: vec![],
                processing_time_ms: 0,
                interpretation: String::new(),
                confidence: 0,
                service_status: ServiceStatus::Ok,
                fallback_used: false,
                from_cache: false,
                persist_failures: 0,
            },
        }
    }

    #[test]
    fn test_set_then_get_returns_payload() {
        let cache = SearchCache::new();
        let result = empty_result();
        let id = result.metadata.search_id;

        cache.set("abc", result);
        let fetched = cache.get("abc").unwrap();
        assert_eq!(fetched.metadata.search_id, id);
    }

    #[test]
    fn test_fingerprint_is_order_independent() {
        let cache = SearchCache::new();
        let a = cache.fingerprint(
            "React developer senior",
            Some("Berlin"),
            &["github".into(), "linkedin".into()],
        );
        let b = cache.fingerprint(
            "senior developer React",
            Some("berlin"),
            &["linkedin".into(), "github".into()],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_differs_across_sources() {
        let cache = SearchCache::new();
        let a = cache.fingerprint("rust", None, &["github".into()]);
        let b = cache.fingerprint("rust", None, &["linkedin".into()]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_expired_entry_is_removed_on_read() {
        let cache = SearchCache::with_config(CacheConfig {
            ttl: Duration::from_millis(30),
            ..Default::default()
        });
        cache.set("abc", empty_result());

        std::thread::sleep(Duration::from_millis(50));
        assert!(cache.get("abc").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_lru_eviction_picks_oldest_accessed() {
        let cache = SearchCache::with_config(CacheConfig {
            max_entries: 2,
            ..Default::default()
        });
        cache.set("first", empty_result());
        std::thread::sleep(Duration::from_millis(5));
        cache.set("second", empty_result());
        std::thread::sleep(Duration::from_millis(5));

        // Touch "first" so "second" becomes the LRU victim.
        cache.get("first");
        std::thread::sleep(Duration::from_millis(5));
        cache.set("third", empty_result());

        assert_eq!(cache.len(), 2);
        assert!(cache.get("first").is_some());
        assert!(cache.get("second").is_none());
        assert!(cache.get("third").is_some());
    }

    #[test]
    fn test_miss_does_not_populate() {
        let cache = SearchCache::new();
        assert!(cache.get("missing").is_none());
        assert_eq!(cache.len(), 0);
    }
}
