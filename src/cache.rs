//! Bounded description cache.
//!
//! Maps image identity keys to previously generated descriptions. The bound
//! is enforced with strict insertion-order (FIFO) eviction: reads do not
//! reorder entries, and re-inserting an existing key keeps its original
//! queue position. Get and put-with-eviction are each one critical section,
//! so the size invariant holds under concurrent requests.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, String>,
    order: VecDeque<String>,
}

/// Process-wide key -> description store with a configurable maximum size.
#[derive(Debug)]
pub struct DescriptionCache {
    max_size: usize,
    inner: Mutex<CacheInner>,
}

impl DescriptionCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().entries.get(key).cloned()
    }

    /// Insert a description, evicting the oldest-inserted entry if the cache
    /// would exceed its maximum size.
    pub fn put(&self, key: &str, description: &str) {
        let mut inner = self.inner.lock();
        if inner
            .entries
            .insert(key.to_string(), description.to_string())
            .is_none()
        {
            inner.order.push_back(key.to_string());
        }
        while inner.entries.len() > self.max_size {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
