//! Event debounce cache
//!
//! Hosts fan one physical action out into bursts of identical events. The
//! cache memoizes the protection outcome of the first event per key and
//! replays it onto the rest of the burst without re-dispatching, so the
//! expensive resolution runs once per window.
//!
//! Entries expire a fixed interval after they are written, regardless of how
//! often they are read. Expired entries are purged on write; at capacity the
//! oldest write is evicted.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::DebounceConfig;

/// A host event that can be cancelled.
pub trait Cancellable {
    fn is_cancelled(&self) -> bool;
    fn set_cancelled(&mut self, cancelled: bool);
}

/// Memoized outcome for a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// No fresh entry; the next event for this key will dispatch.
    Unknown,
    /// The dispatched event was cancelled; repeats are suppressed.
    Suppressed,
    /// The dispatched event went through; repeats are passed through.
    NotSuppressed,
}

struct Entry {
    cancelled: bool,
    written_at: Instant,
}

/// Capacity-bounded, write-expiring outcome memo keyed by host event
/// identity.
pub struct DebounceCache<K> {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<K, Entry>>,
}

impl<K: Eq + Hash + Clone> DebounceCache<K> {
    pub fn new(config: &DebounceConfig) -> Self {
        Self::with(config.capacity, config.ttl())
    }

    pub fn with(capacity: usize, ttl: Duration) -> Self {
        Self {
            ttl,
            capacity,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The memoized outcome for a key, `Unknown` once the entry expires.
    pub fn outcome(&self, key: &K) -> Outcome {
        let entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.written_at.elapsed() < self.ttl => {
                if entry.cancelled {
                    Outcome::Suppressed
                } else {
                    Outcome::NotSuppressed
                }
            }
            _ => Outcome::Unknown,
        }
    }

    /// Dispatch a derived event at most once per key per window.
    ///
    /// With a fresh memo for the key, the recorded cancellation is replayed
    /// onto the original event and nothing is dispatched. Otherwise the
    /// derived event is dispatched, its cancellation is recorded and
    /// mirrored onto the original. Returns whether a dispatch happened.
    pub fn fire_to_cancel<E: Cancellable>(
        &self,
        original: &mut dyn Cancellable,
        derived: &mut E,
        key: K,
        dispatch: impl FnOnce(&mut E),
    ) -> bool {
        {
            let mut entries = self.lock();
            if let Some(entry) = entries.get(&key) {
                if entry.written_at.elapsed() < self.ttl {
                    if entry.cancelled {
                        original.set_cancelled(true);
                    }
                    return false;
                }
                entries.remove(&key);
            }
        }

        dispatch(derived);
        let cancelled = derived.is_cancelled();
        if cancelled {
            original.set_cancelled(true);
        }

        let mut entries = self.lock();
        entries.retain(|_, e| e.written_at.elapsed() < self.ttl);
        if entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.written_at)
                .map(|(k, _)| k.clone());
            if let Some(k) = oldest {
                entries.remove(&k);
            }
        }
        entries.insert(
            key,
            Entry {
                cancelled,
                written_at: Instant::now(),
            },
        );
        true
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
