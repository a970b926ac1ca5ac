//! In-memory translation-pair cache.
//! Key: blake3 hash of (target code | trimmed source text).
//! Bounded by entry count; the oldest-inserted entry is evicted first.
//! Lookups never promote an entry, so eviction follows insertion order.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use super::{LanguageCode, TranslationPair};

/// Default `CACHE_MAX_ENTRIES`.
pub const DEFAULT_MAX_ENTRIES: usize = 500;

/// A resolved pair as stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub language: LanguageCode,
    pub text: String,
    pub pair: TranslationPair,
    /// Unix epoch milliseconds.
    pub created_at: u64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

pub struct ResultCache {
    inner: Mutex<LruCache<[u8; 32], CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    /// A zero capacity is raised to one entry.
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn compute_key(language: LanguageCode, text: &str) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(language.as_code().as_bytes());
        hasher.update(b"|");
        hasher.update(text.as_bytes());
        *hasher.finalize().as_bytes()
    }

    pub fn get(&self, language: LanguageCode, text: &str) -> Option<CacheEntry> {
        let key = Self::compute_key(language, text);
        let found = {
            let cache = self.inner.lock();
            cache
                .peek(&key)
                .filter(|entry| entry.language == language && entry.text == text)
                .cloned()
        };
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Insert `pair`, replacing any entry for the same key so it becomes the
    /// newest. Evicts the oldest entry first when at capacity.
    pub fn put(&self, language: LanguageCode, text: &str, pair: TranslationPair) {
        let key = Self::compute_key(language, text);
        let entry = CacheEntry {
            language,
            text: text.to_string(),
            pair,
            created_at: now_millis(),
        };
        let mut cache = self.inner.lock();
        cache.pop(&key);
        if let Some((_, evicted)) = cache.push(key, entry) {
            debug!(
                language = %evicted.language,
                chars = evicted.text.chars().count(),
                "cache full, evicted oldest entry"
            );
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        let cache = self.inner.lock();
        CacheStats {
            entries: cache.len(),
            capacity: cache.cap().get(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
