//! Call coalescing.
//!
//! # Responsibilities
//! - Run at most one execution per key at a time
//! - Hand every concurrent caller the same result
//! - Forget the key as soon as the execution finishes
//!
//! # Design Decisions
//! - The leading caller runs the work on its own task; nothing is spawned
//! - Results are published through a `watch` channel, so a waiter that
//!   registered before completion can never miss the value
//! - Not a cache: a call that starts after completion executes again

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Mutex;

use tokio::sync::watch;

type Outcome<T, E> = Option<Result<T, E>>;

enum Registration<T, E> {
    Leader(watch::Sender<Outcome<T, E>>),
    Waiter(watch::Receiver<Outcome<T, E>>),
}

/// Coalesces concurrent calls that share a key.
pub struct Group<K, T, E> {
    calls: Mutex<HashMap<K, watch::Receiver<Outcome<T, E>>>>,
}

impl<K, T, E> Group<K, T, E>
where
    K: Hash + Eq + Clone,
    T: Clone,
    E: Clone,
{
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Execute `work` unless a call for `key` is already running, in which
    /// case wait for that call and return a clone of its result.
    ///
    /// If the leading caller is dropped before it finishes, the waiters
    /// contend again and one of them runs its own `work`.
    pub async fn work<F, Fut>(&self, key: K, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let tx = loop {
            let mut rx = match self.register(&key) {
                Registration::Leader(tx) => break tx,
                Registration::Waiter(rx) => rx,
            };

            // Err: the leader was dropped without publishing, contend again
            let published = match rx.wait_for(Option::is_some).await {
                Ok(outcome) => (*outcome).clone(),
                Err(_) => None,
            };
            if let Some(result) = published {
                return result;
            }
        };

        let flight = Flight { group: self, key };
        let result = work().await;
        drop(flight);

        let _ = tx.send(Some(result.clone()));
        result
    }

    /// Number of keys with a call currently executing.
    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    fn register(&self, key: &K) -> Registration<T, E> {
        let mut calls = self.lock();
        if let Some(rx) = calls.get(key) {
            return Registration::Waiter(rx.clone());
        }

        let (tx, rx) = watch::channel(None);
        calls.insert(key.clone(), rx);
        Registration::Leader(tx)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<K, watch::Receiver<Outcome<T, E>>>> {
        self.calls.lock().expect("singleflight mutex poisoned")
    }
}

impl<K, T, E> Default for Group<K, T, E>
where
    K: Hash + Eq + Clone,
    T: Clone,
    E: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Deregisters the leader's key when the call ends, however it ends.
struct Flight<'a, K, T, E>
where
    K: Hash + Eq + Clone,
    T: Clone,
    E: Clone,
{
    group: &'a Group<K, T, E>,
    key: K,
}

impl<K, T, E> Drop for Flight<'_, K, T, E>
where
    K: Hash + Eq + Clone,
    T: Clone,
    E: Clone,
{
    fn drop(&mut self) {
        self.group.lock().remove(&self.key);
    }
}
