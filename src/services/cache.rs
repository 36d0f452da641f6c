// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for list queries.
//!
//! Keeps the raw JSON of recent `list` responses keyed by resource path and
//! query string, so paging back and forth through a table does not refetch.
//! Any successful mutation on a resource drops that resource's entries.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;
use serde_json::Value;

/// Cached entry: response body + insertion timestamp.
struct CacheEntry {
    value: Value,
    inserted_at: Instant,
}

/// In-process LRU cache for list responses.
pub struct QueryCache {
    cache: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("len", &self.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

fn cache_key(resource: &str, query: &str) -> String {
    format!("{}?{}", resource.trim_end_matches('/'), query)
}

impl QueryCache {
    /// Create a new cache with the given capacity and TTL.
    ///
    /// A zero TTL disables caching.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Get a cached response. Returns `None` if not cached or expired.
    pub fn get(&self, resource: &str, query: &str) -> Option<Value> {
        let key = cache_key(resource, query);
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(&key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.value.clone());
            }
            cache.pop(&key);
        }
        None
    }

    pub fn put(&self, resource: &str, query: &str, value: Value) {
        if self.ttl.is_zero() {
            return;
        }
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                cache_key(resource, query),
                CacheEntry {
                    value,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    /// Drop every cached query for `resource`.
    pub fn invalidate_resource(&self, resource: &str) {
        let prefix = cache_key(resource, "");
        if let Ok(mut cache) = self.cache.lock() {
            let stale: Vec<String> = cache
                .iter()
                .filter(|(key, _)| key.starts_with(&prefix))
                .map(|(key, _)| key.clone())
                .collect();
            for key in stale {
                cache.pop(&key);
            }
        }
    }

    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn put_and_get() {
        let cache = QueryCache::new(10, Duration::from_secs(60));
        cache.put("/projects", "page=1", json!({ "total": 3 }));
        assert_eq!(cache.get("/projects", "page=1"), Some(json!({ "total": 3 })));
        assert_eq!(cache.get("/projects", "page=2"), None);
    }

    #[test]
    fn expired_entries_are_evicted() {
        let cache = QueryCache::new(10, Duration::from_millis(1));
        cache.put("/projects", "", json!([]));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("/projects", "").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_ttl_disables_cache() {
        let cache = QueryCache::new(10, Duration::ZERO);
        cache.put("/projects", "", json!([]));
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_only_touches_one_resource() {
        let cache = QueryCache::new(10, Duration::from_secs(60));
        cache.put("/projects", "page=1", json!(1));
        cache.put("/projects", "page=2", json!(2));
        cache.put("/projects-archive", "", json!(3));
        cache.put("/agents", "page=1", json!(4));

        cache.invalidate_resource("/projects");

        assert!(cache.get("/projects", "page=1").is_none());
        assert!(cache.get("/projects", "page=2").is_none());
        assert!(cache.get("/projects-archive", "").is_some());
        assert!(cache.get("/agents", "page=1").is_some());
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let cache = QueryCache::new(2, Duration::from_secs(60));
        cache.put("/a", "", json!(1));
        cache.put("/b", "", json!(2));
        cache.get("/a", "");
        cache.put("/c", "", json!(3));
        assert!(cache.get("/b", "").is_none());
        assert!(cache.get("/a", "").is_some());
        assert_eq!(cache.len(), 2);
    }
}
