//! Keyed memoizing cache shared by all compiler stages.
//!
//! The first caller of [`MemoCache::get_or_compute`] for a key claims it and
//! runs the computation inline on its own thread. Every other caller for the
//! same key blocks until the claimant publishes the outcome. Because a claimed
//! key is always being actively computed, a waiter never waits on work that
//! is merely queued, so stage pools cannot starve each other.

use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};

use crate::error::MemoError;

/// The shared result of one computation.
pub type Outcome<V, E> = Result<Arc<V>, Arc<E>>;

enum State<V, E> {
    Running(ThreadId),
    Done(Outcome<V, E>),
}

struct Slot<V, E> {
    state: Mutex<State<V, E>>,
    ready: Condvar,
}

impl<V, E> Slot<V, E> {
    fn claimed() -> Self {
        Self {
            state: Mutex::new(State::Running(thread::current().id())),
            ready: Condvar::new(),
        }
    }

    fn complete(&self, outcome: Outcome<V, E>) {
        *self.state.lock() = State::Done(outcome);
        self.ready.notify_all();
    }

    fn peek(&self) -> Option<Outcome<V, E>> {
        match &*self.state.lock() {
            State::Done(outcome) => Some(outcome.clone()),
            State::Running(_) => None,
        }
    }

    fn wait(&self, cache: &'static str, key: &dyn Display) -> Outcome<V, E>
    where
        E: From<MemoError>,
    {
        let me = thread::current().id();
        let mut state = self.state.lock();
        loop {
            let owner = match &*state {
                State::Done(outcome) => return outcome.clone(),
                State::Running(owner) => *owner,
            };
            if owner == me {
                return Err(Arc::new(E::from(MemoError::Reentrant {
                    cache,
                    key: key.to_string(),
                })));
            }
            self.ready.wait(&mut state);
        }
    }
}

/// Publishes a panic as an error if the computation unwinds, so waiters are
/// released.
struct Claim<'a, V, E: From<MemoError>> {
    slot: &'a Slot<V, E>,
    cache: &'static str,
    key: &'a dyn Display,
    finished: bool,
}

impl<V, E: From<MemoError>> Claim<'_, V, E> {
    fn finish(mut self, outcome: Outcome<V, E>) {
        self.finished = true;
        self.slot.complete(outcome);
    }
}

impl<V, E: From<MemoError>> Drop for Claim<'_, V, E> {
    fn drop(&mut self) {
        if !self.finished {
            self.slot.complete(Err(Arc::new(E::from(MemoError::Panicked {
                cache: self.cache,
                key: self.key.to_string(),
            }))));
        }
    }
}

/// A concurrent map from keys to lazily computed, immutable results.
///
/// Errors are memoized exactly like values: once a computation for a key
/// fails, every later request for that key receives the same `Arc` error.
pub struct MemoCache<K, V, E> {
    name: &'static str,
    slots: DashMap<K, Arc<Slot<V, E>>>,
}

impl<K, V, E> MemoCache<K, V, E>
where
    K: Eq + Hash + Clone + Display,
    E: From<MemoError>,
{
    /// Creates an empty cache. `name` appears in [`MemoError`] messages.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slots: DashMap::new(),
        }
    }

    /// The name given at construction.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the outcome for `key`, running `compute` if nobody has claimed
    /// the key yet.
    ///
    /// `compute` runs at most once per key for the lifetime of the cache. It
    /// returns its error already shared so that a failure pulled from another
    /// cache can be passed on unchanged. A computation that asks for its own
    /// key gets a [`MemoError::Reentrant`] error instead of deadlocking.
    pub fn get_or_compute(
        &self,
        key: K,
        compute: impl FnOnce() -> Result<V, Arc<E>>,
    ) -> Outcome<V, E> {
        let (slot, claimed) = match self.slots.entry(key.clone()) {
            Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            Entry::Vacant(entry) => {
                let slot = Arc::new(Slot::claimed());
                entry.insert(Arc::clone(&slot));
                (slot, true)
            }
        };
        if !claimed {
            return slot.wait(self.name, &key);
        }
        let claim = Claim {
            slot: &slot,
            cache: self.name,
            key: &key,
            finished: false,
        };
        let outcome = compute().map(Arc::new);
        claim.finish(outcome.clone());
        outcome
    }

    /// Waits for the outcome of a key someone has already claimed.
    ///
    /// Returns `None`, without blocking, when the key was never requested.
    pub fn wait_for(&self, key: &K) -> Option<Outcome<V, E>> {
        let slot = self.slots.get(key).map(|s| Arc::clone(s.value()))?;
        Some(slot.wait(self.name, key))
    }

    /// Returns the outcome for `key` only if it is already available.
    pub fn peek(&self, key: &K) -> Option<Outcome<V, E>> {
        self.slots.get(key)?.value().peek()
    }

    /// Whether `key` has been claimed, finished or not.
    pub fn contains(&self, key: &K) -> bool {
        self.slots.contains_key(key)
    }

    /// Number of claimed keys.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no key has been claimed.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
