//! Thread-safe facade over [`Lru`].

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Mutex;

use super::Lru;

/// An [`Lru`] shared between tasks.
///
/// Every operation takes the single lock exactly once; the core algorithm
/// never sees concurrent access.
pub struct SyncLru<K, V> {
    inner: Mutex<Lru<K, V>>,
}

impl<K, V> SyncLru<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create a cache holding at most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Lru::new(capacity)),
        }
    }

    /// Insert or update `key`, making it the most recently used entry.
    pub fn add(&self, key: K, value: V) {
        self.lock().add(key, value);
    }

    /// Clone out the value for `key`, promoting it on a hit.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.lock().get(key).cloned()
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lock().remove(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Lru<K, V>> {
        self.inner.lock().expect("lru mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn shared_between_threads() {
        let cache = Arc::new(SyncLru::new(64));

        let workers: Vec<_> = (0..8u32)
            .map(|worker| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..1_000u32 {
                        let key = (worker * 1_000 + i) % 200;
                        cache.add(key, i);
                        let _ = cache.get(&key);
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(cache.len(), 64);
        assert_eq!(cache.capacity(), 64);
    }

    #[test]
    fn get_returns_clone() {
        let cache = SyncLru::new(2);
        cache.add("a".to_string(), vec![1, 2, 3]);

        assert_eq!(cache.get("a"), Some(vec![1, 2, 3]));
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.remove("a"), Some(vec![1, 2, 3]));
        assert!(cache.is_empty());
    }
}
