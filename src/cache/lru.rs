//! Single-threaded LRU core.
//!
//! Entries live in an arena of slots. Each occupied slot carries the indices
//! of its neighbours: `prev` points toward `front` (more recent), `next`
//! points toward `rear` (less recent). Vacated slots form a free list and are
//! reused before the arena grows.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::mem;

struct Entry<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

enum Slot<K, V> {
    Occupied(Entry<K, V>),
    Vacant { next_free: Option<usize> },
}

/// Least-recently-used cache without internal locking.
///
/// Use [`SyncLru`](super::SyncLru) when the cache is shared between tasks.
pub struct Lru<K, V> {
    map: HashMap<K, usize>,
    slots: Vec<Slot<K, V>>,
    free: Option<usize>,
    front: Option<usize>,
    rear: Option<usize>,
    capacity: usize,
    available: usize,
}

impl<K, V> Lru<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create a cache holding at most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "lru capacity must be greater than zero");

        Self {
            map: HashMap::with_capacity(capacity),
            slots: Vec::new(),
            free: None,
            front: None,
            rear: None,
            capacity,
            available: capacity,
        }
    }

    /// Insert or update `key`, making it the most recently used entry.
    ///
    /// A new key on a full cache evicts the least recently used entry first.
    pub fn add(&mut self, key: K, value: V) {
        if let Some(&idx) = self.map.get(&key) {
            self.entry_mut(idx).value = value;
            self.promote(idx);
            return;
        }

        if self.available == 0 {
            self.evict();
        }

        let idx = self.alloc(Entry {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.push_front(idx);
        self.map.insert(key, idx);
        self.available -= 1;
    }

    /// Look up `key`, promoting it on a hit. A miss leaves recency untouched.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.map.get(key)?;
        self.promote(idx);
        Some(&self.entry(idx).value)
    }

    /// Remove `key` and return its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.map.remove(key)?;
        self.unlink(idx);
        self.available += 1;
        Some(self.release(idx).value)
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Maximum number of resident entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn evict(&mut self) {
        let Some(idx) = self.rear else {
            unreachable!("full lru has no rear entry");
        };
        self.unlink(idx);
        let evicted = self.release(idx);
        self.map.remove(&evicted.key);
        self.available += 1;
    }

    fn promote(&mut self, idx: usize) {
        if self.front == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.push_front(idx);
    }

    fn push_front(&mut self, idx: usize) {
        let old_front = self.front;
        {
            let entry = self.entry_mut(idx);
            entry.prev = None;
            entry.next = old_front;
        }
        match old_front {
            Some(front) => self.entry_mut(front).prev = Some(idx),
            None => self.rear = Some(idx),
        }
        self.front = Some(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let entry = self.entry_mut(idx);
            (entry.prev.take(), entry.next.take())
        };
        match prev {
            Some(prev) => self.entry_mut(prev).next = next,
            None => self.front = next,
        }
        match next {
            Some(next) => self.entry_mut(next).prev = prev,
            None => self.rear = prev,
        }
    }

    fn alloc(&mut self, entry: Entry<K, V>) -> usize {
        match self.free {
            Some(idx) => {
                let Slot::Vacant { next_free } = self.slots[idx] else {
                    unreachable!("occupied slot {idx} on the free list");
                };
                self.free = next_free;
                self.slots[idx] = Slot::Occupied(entry);
                idx
            }
            None => {
                self.slots.push(Slot::Occupied(entry));
                self.slots.len() - 1
            }
        }
    }

    fn release(&mut self, idx: usize) -> Entry<K, V> {
        let vacant = Slot::Vacant {
            next_free: self.free,
        };
        match mem::replace(&mut self.slots[idx], vacant) {
            Slot::Occupied(entry) => {
                self.free = Some(idx);
                entry
            }
            Slot::Vacant { .. } => unreachable!("released vacant slot {idx}"),
        }
    }

    fn entry(&self, idx: usize) -> &Entry<K, V> {
        match &self.slots[idx] {
            Slot::Occupied(entry) => entry,
            Slot::Vacant { .. } => unreachable!("vacant slot {idx} linked into lru"),
        }
    }

    fn entry_mut(&mut self, idx: usize) -> &mut Entry<K, V> {
        match &mut self.slots[idx] {
            Slot::Occupied(entry) => entry,
            Slot::Vacant { .. } => unreachable!("vacant slot {idx} linked into lru"),
        }
    }
}

#[cfg(test)]
impl<K, V> Lru<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Keys from most to least recently used, following `next` links.
    fn keys_front_to_rear(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.len());
        let mut cursor = self.front;
        while let Some(idx) = cursor {
            let entry = self.entry(idx);
            keys.push(entry.key.clone());
            cursor = entry.next;
        }
        keys
    }

    /// Keys from least to most recently used, following `prev` links.
    fn keys_rear_to_front(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.len());
        let mut cursor = self.rear;
        while let Some(idx) = cursor {
            let entry = self.entry(idx);
            keys.push(entry.key.clone());
            cursor = entry.prev;
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;

    /// Checks list/map agreement and returns the front-to-rear key order.
    fn assert_consistent(cache: &Lru<u32, u32>) -> Vec<u32> {
        let forward = cache.keys_front_to_rear();
        let mut backward = cache.keys_rear_to_front();
        backward.reverse();
        assert_eq!(forward, backward, "forward and reverse links disagree");
        assert_eq!(forward.len(), cache.len());
        assert!(cache.len() <= cache.capacity());

        let unique: HashSet<_> = forward.iter().copied().collect();
        assert_eq!(unique.len(), forward.len(), "key linked twice");
        for key in &forward {
            assert!(cache.map.contains_key(key));
        }

        match (cache.front, cache.rear) {
            (None, None) => assert!(cache.is_empty()),
            (Some(front), Some(rear)) => {
                assert!(!cache.is_empty());
                if cache.len() == 1 {
                    assert_eq!(front, rear);
                }
            }
            _ => panic!("front and rear must be both set or both absent"),
        }

        forward
    }

    #[test]
    #[should_panic(expected = "capacity")]
    fn zero_capacity_panics() {
        let _ = Lru::<u32, u32>::new(0);
    }

    #[test]
    fn promote_on_add_protects_from_eviction() {
        let mut cache = Lru::new(2);
        cache.add(1, 1);
        cache.add(2, 2);
        cache.add(1, 1);
        cache.add(3, 3);

        assert_eq!(assert_consistent(&cache), vec![3, 1]);
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some(&1));
        assert_eq!(cache.get(&3), Some(&3));
    }

    #[test]
    fn single_slot_update() {
        let mut cache = Lru::new(1);
        cache.add(1, 1);
        cache.add(1, 2);

        assert_eq!(cache.get(&1), Some(&2));
        assert_eq!(assert_consistent(&cache), vec![1]);
    }

    #[test]
    fn single_slot_eviction() {
        let mut cache = Lru::new(1);
        cache.add(1, 1);
        cache.add(2, 2);

        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some(&2));
        assert_eq!(assert_consistent(&cache), vec![2]);
    }

    #[test]
    fn get_promotes_rear() {
        let mut cache = Lru::new(3);
        cache.add(1, 10);
        cache.add(2, 20);
        cache.add(3, 30);
        assert_eq!(assert_consistent(&cache), vec![3, 2, 1]);

        assert_eq!(cache.get(&1), Some(&10));
        assert_eq!(assert_consistent(&cache), vec![1, 3, 2]);

        cache.add(4, 40);
        assert_eq!(assert_consistent(&cache), vec![4, 1, 3]);
    }

    #[test]
    fn miss_does_not_touch_recency() {
        let mut cache = Lru::new(2);
        cache.add(1, 1);
        cache.add(2, 2);

        assert_eq!(cache.get(&9), None);
        assert_eq!(assert_consistent(&cache), vec![2, 1]);
    }

    #[test]
    fn remove_frees_slot_for_reuse() {
        let mut cache = Lru::new(3);
        cache.add(1, 1);
        cache.add(2, 2);
        cache.add(3, 3);

        assert_eq!(cache.remove(&2), Some(2));
        assert_eq!(cache.remove(&2), None);
        assert_eq!(assert_consistent(&cache), vec![3, 1]);

        cache.add(4, 4);
        assert_eq!(cache.slots.len(), 3);
        assert_eq!(assert_consistent(&cache), vec![4, 3, 1]);

        // full again, so the next new key evicts the rear
        cache.add(5, 5);
        assert_eq!(assert_consistent(&cache), vec![5, 4, 3]);
    }

    #[test]
    fn remove_until_empty() {
        let mut cache = Lru::new(2);
        cache.add(1, 1);
        cache.add(2, 2);
        cache.remove(&1);
        cache.remove(&2);

        assert!(cache.is_empty());
        assert_consistent(&cache);

        cache.add(3, 3);
        assert_eq!(assert_consistent(&cache), vec![3]);
    }

    #[test]
    fn borrowed_lookup() {
        let mut cache: Lru<String, u8> = Lru::new(4);
        cache.add("ipexample.com".to_string(), 1);
        assert_eq!(cache.get("ipexample.com"), Some(&1));
        assert_eq!(cache.remove("ipexample.com"), Some(1));
    }

    #[test]
    fn random_operations_match_model() {
        const CAPACITY: usize = 16;
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut cache = Lru::new(CAPACITY);
        // most recent first
        let mut model: Vec<(u32, u32)> = Vec::new();

        for step in 0..5_000u32 {
            let key = rng.gen_range(0..48);
            match rng.gen_range(0..10) {
                0..=4 => {
                    cache.add(key, step);
                    model.retain(|(k, _)| *k != key);
                    model.insert(0, (key, step));
                    model.truncate(CAPACITY);
                }
                5..=8 => {
                    let expected = model.iter().position(|(k, _)| *k == key);
                    let got = cache.get(&key).copied();
                    match expected {
                        Some(pos) => {
                            let entry = model.remove(pos);
                            assert_eq!(got, Some(entry.1));
                            model.insert(0, entry);
                        }
                        None => assert_eq!(got, None),
                    }
                }
                _ => {
                    let pos = model.iter().position(|(k, _)| *k == key);
                    let expected = pos.map(|pos| model.remove(pos).1);
                    assert_eq!(cache.remove(&key), expected);
                }
            }

            let order = assert_consistent(&cache);
            let model_order: Vec<u32> = model.iter().map(|(k, _)| *k).collect();
            assert_eq!(order, model_order, "recency diverged at step {step}");
        }
    }
}
