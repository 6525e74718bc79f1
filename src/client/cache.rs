use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::store::KeyValueStore;

/// How long a resolved count is trusted.
pub const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const KEY_PREFIX: &str = "scholar_citations:";

pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub citations: u64,
    /// Epoch milliseconds at write time.
    pub timestamp: i64,
}

impl CacheEntry {
    pub fn is_fresh(&self, now_millis: i64, ttl: Duration) -> bool {
        let age = now_millis.saturating_sub(self.timestamp);
        age >= 0 && (age as u128) < ttl.as_millis()
    }
}

pub fn cache_key(title: &str) -> String {
    let normalized = title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    format!("{KEY_PREFIX}{normalized}")
}

/// Time-bounded citation cache over an injected store. Store failures are
/// logged and treated as misses.
#[derive(Clone)]
pub struct CitationCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl CitationCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock, ttl: CACHE_TTL }
    }

    pub fn get(&self, title: &str) -> Option<u64> {
        let key = cache_key(title);
        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Cache read failed for {key}: {e}");
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) if entry.is_fresh(self.clock.now_millis(), self.ttl) => Some(entry.citations),
            Ok(_) => {
                tracing::debug!("Evicting expired cache entry {key}");
                self.evict(&key);
                None
            }
            Err(e) => {
                tracing::warn!("Discarding unreadable cache entry {key}: {e}");
                self.evict(&key);
                None
            }
        }
    }

    pub fn put(&self, title: &str, citations: u64) {
        let key = cache_key(title);
        let entry = CacheEntry {
            citations,
            timestamp: self.clock.now_millis(),
        };
        let result = serde_json::to_string(&entry)
            .map_err(|e| e.to_string())
            .and_then(|raw| self.store.set(&key, &raw).map_err(|e| e.to_string()));
        if let Err(e) = result {
            tracing::warn!("Cache write failed for {key}: {e}");
        }
    }

    fn evict(&self, key: &str) {
        if let Err(e) = self.store.delete(key) {
            tracing::warn!("Cache delete failed for {key}: {e}");
        }
    }
}
