//! Bounded memoization of translation results
//!
//! Entries live until capacity forces an eviction; there is no TTL. Lookup,
//! insert and eviction are serialized behind one lock so capacity and recency
//! order stay consistent when several workers share the cache. The compute
//! step itself runs outside the lock, so two requests for the same key may
//! both reach the service; the later insert wins.

use lru::LruCache;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::models::{LanguagePair, TranslationResult};

/// Exact text plus resolved pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Trimmed query text
    pub text: String,
    /// `None` for auto-detect
    pub source_lang: Option<String>,
    /// Target language code
    pub target_lang: String,
}

impl CacheKey {
    /// Key for `text` translated under `pair`
    pub fn new(text: &str, pair: &LanguagePair) -> Self {
        Self {
            text: text.trim().to_string(),
            source_lang: pair.source.clone(),
            target_lang: pair.target.clone(),
        }
    }
}

/// Decides which entry leaves when the cache is full
pub trait EvictionPolicy<K>: Send {
    /// A new key was stored
    fn on_insert(&mut self, key: &K);
    /// An existing key was read or overwritten
    fn on_access(&mut self, key: &K);
    /// A key left the cache for any reason
    fn on_remove(&mut self, key: &K);
    /// Pick and forget the next victim
    fn evict(&mut self) -> Option<K>;
}

/// Least recently accessed goes first; untouched keys leave in insertion order
pub struct LeastRecentlyUsed<K: Hash + Eq> {
    order: LruCache<K, ()>,
}

impl<K: Hash + Eq> LeastRecentlyUsed<K> {
    /// Empty policy
    pub fn new() -> Self {
        Self {
            order: LruCache::unbounded(),
        }
    }
}

impl<K: Hash + Eq> Default for LeastRecentlyUsed<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq + Clone + Send> EvictionPolicy<K> for LeastRecentlyUsed<K> {
    fn on_insert(&mut self, key: &K) {
        self.order.put(key.clone(), ());
    }

    fn on_access(&mut self, key: &K) {
        self.order.promote(key);
    }

    fn on_remove(&mut self, key: &K) {
        self.order.pop(key);
    }

    fn evict(&mut self) -> Option<K> {
        self.order.pop_lru().map(|(key, _)| key)
    }
}

/// Oldest insert goes first regardless of reads
pub struct InsertionOrder<K> {
    order: VecDeque<K>,
}

impl<K> Default for InsertionOrder<K> {
    fn default() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }
}

impl<K: PartialEq + Clone + Send> EvictionPolicy<K> for InsertionOrder<K> {
    fn on_insert(&mut self, key: &K) {
        self.order.push_back(key.clone());
    }

    fn on_access(&mut self, _key: &K) {}

    fn on_remove(&mut self, key: &K) {
        self.order.retain(|k| k != key);
    }

    fn evict(&mut self) -> Option<K> {
        self.order.pop_front()
    }
}

struct CacheState {
    entries: HashMap<CacheKey, TranslationResult>,
    policy: Box<dyn EvictionPolicy<CacheKey>>,
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that had to compute
    pub misses: u64,
    /// Entries currently held
    pub entries: usize,
}

/// Bounded translation cache with a pluggable eviction policy
pub struct ResultCache {
    state: Mutex<CacheState>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("capacity", &self.capacity)
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}

impl ResultCache {
    /// LRU cache holding at most `capacity` results (minimum 1)
    pub fn new(capacity: usize) -> Self {
        Self::with_policy(capacity, Box::new(LeastRecentlyUsed::new()))
    }

    /// Cache with a custom eviction policy
    pub fn with_policy(capacity: usize, policy: Box<dyn EvictionPolicy<CacheKey>>) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                policy,
            }),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up a result, refreshing its recency on a hit
    pub async fn get(&self, key: &CacheKey) -> Option<TranslationResult> {
        let mut state = self.state.lock().await;
        let found = state.entries.get(key).cloned();
        if found.is_some() {
            state.policy.on_access(key);
        }
        found
    }

    /// Store a result, evicting as needed to stay within capacity
    pub async fn insert(&self, key: CacheKey, value: TranslationResult) {
        let mut state = self.state.lock().await;

        if state.entries.insert(key.clone(), value).is_some() {
            state.policy.on_access(&key);
            return;
        }
        state.policy.on_insert(&key);

        while state.entries.len() > self.capacity {
            match state.policy.evict() {
                Some(victim) => {
                    state.entries.remove(&victim);
                    debug!(text = %victim.text, "Evicted cache entry");
                }
                None => break,
            }
        }
    }

    /// Return the cached result for `key`, or run `compute` and cache its success
    pub async fn get_or_compute<F, Fut, E>(&self, key: CacheKey, compute: F) -> Result<TranslationResult, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TranslationResult, E>>,
    {
        if let Some(hit) = self.get(&key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(text = %key.text, "Cache hit");
            return Ok(hit);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let value = compute().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }

    /// Presence check that does not touch recency
    pub async fn contains(&self, key: &CacheKey) -> bool {
        self.state.lock().await.entries.contains_key(key)
    }

    /// Number of entries
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    /// Whether the cache holds nothing
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every entry; counters are kept
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        let keys: Vec<CacheKey> = state.entries.drain().map(|(k, _)| k).collect();
        for key in &keys {
            state.policy.on_remove(key);
        }
    }

    /// Snapshot of the counters
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len().await,
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(100)
    }
}
