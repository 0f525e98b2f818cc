//! In-memory, time-bounded cache of city/state search responses.
//!
//! Entries expire at an absolute instant fixed when they are inserted.
//! Expiry is lazy: a `get` past the deadline is a miss and drops that one
//! entry; [`ResponseCache::purge_expired`] sweeps the rest on demand.
//! A poisoned lock never fails a search; reads become misses and writes are
//! skipped.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::normalize::title_case;
use crate::types::SearchResponse;

/// Default lifetime of a cached search response.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60 * 60);

/// `city:state:Term` with the term title-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    #[must_use]
    pub fn new(city: &str, state: &str, term: &str) -> Self {
        Self(format!(
            "{}:{}:{}",
            city.trim(),
            state.trim(),
            title_case(term)
        ))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
struct CacheEntry {
    response: SearchResponse,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct ResponseCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    default_ttl: Duration,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl ResponseCache {
    #[must_use]
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns a copy of the live entry for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<SearchResponse> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(&self, key: &CacheKey, now: Instant) -> Option<SearchResponse> {
        let expired = {
            let entries = match self.entries.read() {
                Ok(guard) => guard,
                Err(_) => {
                    tracing::warn!(key = %key, "response cache lock poisoned; treating as miss");
                    return None;
                }
            };
            match entries.get(key) {
                Some(entry) if now < entry.expires_at => return Some(entry.response.clone()),
                Some(_) => true,
                None => false,
            }
        };

        if expired {
            if let Ok(mut entries) = self.entries.write() {
                // Re-check: another caller may have refreshed the entry.
                if entries.get(key).is_some_and(|e| now >= e.expires_at) {
                    entries.remove(key);
                }
            }
        }
        None
    }

    /// Stores `response` under `key` until `now + ttl`. Replaces any
    /// existing entry.
    pub fn put(&self, key: CacheKey, response: SearchResponse, ttl: Duration) {
        self.put_at(key, response, ttl, Instant::now());
    }

    /// [`Self::put`] with the cache's default TTL.
    pub fn put_default(&self, key: CacheKey, response: SearchResponse) {
        self.put(key, response, self.default_ttl);
    }

    pub(crate) fn put_at(
        &self,
        key: CacheKey,
        response: SearchResponse,
        ttl: Duration,
        now: Instant,
    ) {
        let Some(expires_at) = now.checked_add(ttl) else {
            tracing::warn!(key = %key, ?ttl, "cache ttl overflows; entry not stored");
            return;
        };
        match self.entries.write() {
            Ok(mut entries) => {
                entries.insert(
                    key,
                    CacheEntry {
                        response,
                        expires_at,
                    },
                );
            }
            Err(_) => {
                tracing::warn!(key = %key, "response cache lock poisoned; skipping write");
            }
        }
    }

    /// Drops every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub(crate) fn purge_expired_at(&self, now: Instant) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        before - entries.len()
    }

    /// Number of stored entries, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
