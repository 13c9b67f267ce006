//! Bounded in-memory grid cache
//!
//! Keys are `<location>_<resolution>_<area>` (see [`crate::models::cache_key`]).
//! When full, the entry inserted earliest is evicted. Reads do not refresh an
//! entry's position.

use crate::models::ElevationGrid;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

pub const DEFAULT_CACHE_CAPACITY: usize = 10;

/// Cached grid with its insertion time
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub grid: Arc<ElevationGrid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    /// Insertion order, oldest first
    order: VecDeque<String>,
}

/// FIFO grid cache, safe to share between tasks
pub struct GridCache {
    /// Maximum entries; 0 is unbounded
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl Default for GridCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl GridCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<ElevationGrid>> {
        self.lock().entries.get(key).map(|e| Arc::clone(&e.grid))
    }

    /// Insert or replace `key`
    ///
    /// Replacing moves the key to the back of the eviction order and resets
    /// its timestamp.
    pub fn put(&self, key: &str, grid: Arc<ElevationGrid>) {
        let mut inner = self.lock();

        if inner.entries.contains_key(key) {
            inner.order.retain(|k| k != key);
        }

        while self.capacity > 0 && inner.order.len() >= self.capacity {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                    tracing::debug!(key = %oldest, "Evicted cached grid");
                }
                None => break,
            }
        }

        inner.order.push_back(key.to_string());
        inner.entries.insert(
            key.to_string(),
            CacheEntry {
                key: key.to_string(),
                grid,
                created_at: Utc::now(),
            },
        );
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    pub fn entry_created_at(&self, key: &str) -> Option<DateTime<Utc>> {
        self.lock().entries.get(key).map(|e| e.created_at)
    }

    /// Snapshot of all entries, oldest first
    pub fn entries(&self) -> Vec<CacheEntry> {
        let inner = self.lock();
        inner
            .order
            .iter()
            .filter_map(|k| inner.entries.get(k).cloned())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
