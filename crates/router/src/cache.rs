//! Memoization of route lookups.
//!
//! Both hits and misses are cached under a `"METHOD path"` key. Every entry is stamped with the
//! generation it was computed in; clearing the cache, disabling it or swapping the route table
//! starts a new generation, and entries from older generations are never served.

use crate::router::RouteMatch;
use dashmap::DashMap;
use http::Method;
use lru::LruCache;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::trace;

/// Default number of entries kept by the built-in caches.
pub const DEFAULT_CAPACITY: usize = 1024;

/// A cached lookup, `None` being a cached miss.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    generation: u64,
    lookup: Option<RouteMatch>,
}

impl CacheEntry {
    pub fn new(generation: u64, lookup: Option<RouteMatch>) -> Self {
        Self { generation, lookup }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn lookup(&self) -> Option<&RouteMatch> {
        self.lookup.as_ref()
    }
}

/// Storage behind the lookup cache. Implementations must be safe to share between threads and
/// must keep their size bounded.
pub trait LookupCache: Send + Sync + fmt::Debug {
    fn get(&self, key: &str) -> Option<CacheEntry>;

    fn insert(&self, key: String, entry: CacheEntry);

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A least-recently-used cache behind a single lock.
#[derive(Debug)]
pub struct LruLookupCache {
    inner: Mutex<LruCache<String, CacheEntry>>,
}

impl LruLookupCache {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self { inner: Mutex::new(LruCache::new(capacity)) }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, CacheEntry>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LruLookupCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LookupCache for LruLookupCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        self.lock().get(key).cloned()
    }

    fn insert(&self, key: String, entry: CacheEntry) {
        if let Some((evicted, _)) = self.lock().push(key, entry) {
            trace!(key = %evicted, "drop lookup cache entry");
        }
    }

    fn clear(&self) {
        self.lock().clear();
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

/// A sharded map for read-heavy workloads.
///
/// There is no eviction: once `capacity` keys are stored, new keys are not cached until the
/// next clear. Existing keys are still refreshed. A new key is inserted first and taken back out
/// if the map went over `capacity`, so concurrent inserts may overshoot only while they run.
#[derive(Debug)]
pub struct ShardedLookupCache {
    entries: DashMap<String, CacheEntry>,
    capacity: usize,
}

impl ShardedLookupCache {
    pub fn new(capacity: usize) -> Self {
        Self { entries: DashMap::new(), capacity }
    }
}

impl Default for ShardedLookupCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LookupCache for ShardedLookupCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn insert(&self, key: String, entry: CacheEntry) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            trace!(key, capacity = self.capacity, "lookup cache is full, skip");
            return;
        }
        if self.entries.insert(key.clone(), entry).is_none() && self.entries.len() > self.capacity {
            self.entries.remove(&key);
            trace!(key, capacity = self.capacity, "lookup cache overflowed, drop new key");
        }
    }

    fn clear(&self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

pub(crate) fn cache_key(method: &Method, path: &str) -> String {
    format!("{method} {path}")
}

/// Generation bookkeeping and the enable switch around a [`LookupCache`].
#[derive(Debug)]
pub(crate) struct RouteCache {
    store: Box<dyn LookupCache>,
    generation: AtomicU64,
    enabled: AtomicBool,
    cache_dynamic_routes: bool,
}

impl RouteCache {
    pub(crate) fn new(store: Box<dyn LookupCache>, enabled: bool, cache_dynamic_routes: bool) -> Self {
        Self { store, generation: AtomicU64::new(0), enabled: AtomicBool::new(enabled), cache_dynamic_routes }
    }

    /// The generation a caller must read before loading the route table it resolves against.
    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Returns the cached lookup for `key` if it was stored in `generation`.
    ///
    /// The outer `Option` is the cache hit, the inner one the cached route match.
    pub(crate) fn get(&self, key: &str, generation: u64) -> Option<Option<RouteMatch>> {
        if !self.is_enabled() {
            return None;
        }
        let entry = self.store.get(key)?;
        if entry.generation != generation {
            trace!(key, cached = entry.generation, current = generation, "ignore stale lookup");
            return None;
        }
        trace!(key, hit = entry.lookup.is_some(), "lookup cache hit");
        Some(entry.lookup)
    }

    pub(crate) fn put(&self, key: String, generation: u64, lookup: Option<&RouteMatch>) {
        if !self.is_enabled() {
            return;
        }
        if !self.cache_dynamic_routes && lookup.is_some_and(|found| !found.params().is_empty()) {
            return;
        }
        self.store.insert(key, CacheEntry::new(generation, lookup.cloned()));
    }

    /// Starts a new generation and drops every stored entry.
    pub(crate) fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.store.clear();
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
        self.invalidate();
    }

    pub(crate) fn len(&self) -> usize {
        self.store.len()
    }
}
