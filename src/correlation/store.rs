//! Time-bounded key/value store.
//!
//! # Responsibilities
//! - Hold pending exchange and span completions until they settle
//! - Make an entry absent once its TTL elapses, whether or not it was read
//!
//! # Design Decisions
//! - `DashMap` gives per-key atomicity; registration uses the entry API
//! - Deadlines use `tokio::time::Instant` so tests can drive the clock
//! - Expired entries are evicted lazily on access and by a periodic `sweep`

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

struct Slot<V> {
    value: V,
    deadline: Instant,
}

impl<V> Slot<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            deadline: Instant::now() + ttl,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

/// A concurrent map whose entries expire after a per-entry TTL.
pub struct TtlMap<K, V> {
    inner: DashMap<K, Slot<V>>,
}

impl<K: Eq + Hash, V> TtlMap<K, V> {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    /// Insert or replace an entry. Returns the previous live value, if any.
    pub fn put(&self, key: K, value: V, ttl: Duration) -> Option<V> {
        let now = Instant::now();
        self.inner
            .insert(key, Slot::new(value, ttl))
            .filter(|old| !old.is_expired(now))
            .map(|old| old.value)
    }

    /// Insert only if no live entry exists for `key`.
    ///
    /// An expired entry still sitting in the map counts as absent and is
    /// replaced. On conflict the rejected value is handed back.
    pub fn try_put(&self, key: K, value: V, ttl: Duration) -> Result<(), V> {
        let now = Instant::now();
        match self.inner.entry(key) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now) {
                    occupied.insert(Slot::new(value, ttl));
                    Ok(())
                } else {
                    Err(value)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::new(value, ttl));
                Ok(())
            }
        }
    }

    /// Clone out a live value. Absent and expired keys both yield `None`.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let now = Instant::now();
        if let Some(slot) = self.inner.get(key) {
            if !slot.is_expired(now) {
                return Some(slot.value.clone());
            }
        } else {
            return None;
        }
        self.evict_if_expired(key, now);
        None
    }

    /// Run `f` against a live value in place.
    ///
    /// `f` runs under the shard lock and must not touch this map.
    pub fn update<R>(&self, key: &K, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        let now = Instant::now();
        let mut expired = false;
        let result = match self.inner.get_mut(key) {
            Some(mut slot) if !slot.is_expired(now) => Some(f(&mut slot.value)),
            Some(_) => {
                expired = true;
                None
            }
            None => None,
        };
        if expired {
            self.evict_if_expired(key, now);
        }
        result
    }

    /// Remove an entry, live or not.
    pub fn delete(&self, key: &K) -> Option<V> {
        self.inner.remove(key).map(|(_, slot)| slot.value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        let now = Instant::now();
        self.inner
            .get(key)
            .map(|slot| !slot.is_expired(now))
            .unwrap_or(false)
    }

    /// Evict every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut evicted = 0;
        self.inner.retain(|_, slot| {
            let keep = !slot.is_expired(now);
            if !keep {
                evicted += 1;
            }
            keep
        });
        evicted
    }

    /// Number of entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn evict_if_expired(&self, key: &K, now: Instant) {
        self.inner.remove_if(key, |_, slot| slot.is_expired(now));
    }
}

impl<K: Eq + Hash, V> Default for TtlMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
