//! Bounded LRU cache
//!
//! Generic, domain-free memoization used at the parser, simplifier, and
//! materializer boundaries. The same condition expressions recur across
//! many components, so these caches are the only long-lived state in the
//! pipeline. Eviction supports an optional callback so dependents can
//! invalidate derived state; a callback that panics is contained and the
//! entry is removed regardless.

use std::collections::HashMap;
use std::hash::Hash;
use std::panic::{catch_unwind, AssertUnwindSafe};

pub type EvictionCallback<K, V> = Box<dyn Fn(&K, &V)>;

pub struct LruCache<K, V> {
    entries: HashMap<K, Slot<V>>,
    capacity: usize,
    clock: u64,
    on_evict: Option<EvictionCallback<K, V>>,
    hits: u64,
    misses: u64,
}

struct Slot<V> {
    value: V,
    last_used: u64,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "LRU capacity must be non-zero");
        Self {
            entries: HashMap::with_capacity(capacity),
            capacity,
            clock: 0,
            on_evict: None,
            hits: 0,
            misses: 0,
        }
    }

    /// Install an eviction callback invoked for every entry removed by
    /// capacity pressure.
    pub fn with_eviction_callback(mut self, callback: EvictionCallback<K, V>) -> Self {
        self.on_evict = Some(callback);
        self
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.clock += 1;
        let clock = self.clock;
        match self.entries.get_mut(key) {
            Some(slot) => {
                slot.last_used = clock;
                self.hits += 1;
                Some(&slot.value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.clock += 1;
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_least_recent();
        }
        self.entries.insert(
            key,
            Slot {
                value,
                last_used: self.clock,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// (hits, misses) counters since construction.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    fn evict_least_recent(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, slot)| slot.last_used)
            .map(|(key, _)| key.clone());

        if let Some(key) = victim {
            if let Some(slot) = self.entries.remove(&key) {
                if let Some(callback) = &self.on_evict {
                    // A failing callback must not corrupt cache bookkeeping.
                    let _ = catch_unwind(AssertUnwindSafe(|| callback(&key, &slot.value)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_get_insert() {
        let mut cache: LruCache<String, u32> = LruCache::new(4);
        assert!(cache.is_empty());
        cache.insert("a".to_string(), 1);
        cache.insert("b".to_string(), 2);
        assert_eq!(cache.get(&"a".to_string()), Some(&1));
        assert_eq!(cache.get(&"missing".to_string()), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut cache: LruCache<u32, u32> = LruCache::new(2);
        cache.insert(1, 10);
        cache.insert(2, 20);
        // Touch 1 so 2 becomes the LRU entry.
        cache.get(&1);
        cache.insert(3, 30);
        assert!(cache.contains(&1));
        assert!(!cache.contains(&2));
        assert!(cache.contains(&3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_reinsert_does_not_evict() {
        let mut cache: LruCache<u32, u32> = LruCache::new(2);
        cache.insert(1, 10);
        cache.insert(2, 20);
        cache.insert(1, 11);
        assert_eq!(cache.get(&1), Some(&11));
        assert!(cache.contains(&2));
    }

    #[test]
    fn test_eviction_callback_fires() {
        let evicted: Rc<RefCell<Vec<u32>>> = Rc::new(RefCell::new(Vec::new()));
        let log = evicted.clone();
        let mut cache: LruCache<u32, u32> = LruCache::new(1)
            .with_eviction_callback(Box::new(move |key, _| log.borrow_mut().push(*key)));
        cache.insert(1, 10);
        cache.insert(2, 20);
        assert_eq!(*evicted.borrow(), vec![1]);
    }

    #[test]
    fn test_panicking_callback_still_evicts() {
        let mut cache: LruCache<u32, u32> =
            LruCache::new(1).with_eviction_callback(Box::new(|_, _| panic!("callback failure")));
        cache.insert(1, 10);
        cache.insert(2, 20);
        assert!(!cache.contains(&1));
        assert!(cache.contains(&2));
        assert_eq!(cache.len(), 1);
        // Bookkeeping survives: further inserts behave normally.
        cache.insert(3, 30);
        assert!(cache.contains(&3));
    }

    #[test]
    fn test_hit_miss_stats() {
        let mut cache: LruCache<u32, u32> = LruCache::new(2);
        cache.insert(1, 10);
        cache.get(&1);
        cache.get(&2);
        assert_eq!(cache.stats(), (1, 1));
    }
}
