//! Duplicate suppression for admitted transactions.

use std::collections::{HashMap, VecDeque};

use parking_lot::RwLock;

use crate::domain::entities::{Height, TxKey};

/// Bounded first-in-first-out cache of recently admitted transaction keys.
///
/// One per group. A key stays recorded even after its transaction leaves the
/// queue, so a transaction echoed back by peers (or resubmitted locally) is
/// dropped cheaply instead of being admitted twice. When the cache fills,
/// the oldest recorded key is forgotten first.
///
/// A capacity of `0` disables suppression entirely: nothing is recorded and
/// every lookup misses.
pub struct SeenTxCache {
    capacity: usize,
    inner: RwLock<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    seen: HashMap<TxKey, Height>,
    order: VecDeque<TxKey>,
}

impl SeenTxCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: RwLock::new(CacheInner::default()),
        }
    }

    /// Whether `key` is currently recorded.
    pub fn contains(&self, key: &TxKey) -> bool {
        if self.capacity == 0 {
            return false;
        }
        self.inner.read().seen.contains_key(key)
    }

    /// Admission height recorded for `key`, if still cached.
    pub fn seen_height(&self, key: &TxKey) -> Option<Height> {
        if self.capacity == 0 {
            return None;
        }
        self.inner.read().seen.get(key).copied()
    }

    /// Records `key` unless it is already present.
    ///
    /// Returns `true` when the key was absent and is now recorded (or the
    /// cache is disabled), `false` when the key was already known. The check
    /// and the insert happen under one lock, so of two racing identical
    /// admissions exactly one wins.
    pub fn insert_if_absent(&self, key: TxKey, height: Height) -> bool {
        if self.capacity == 0 {
            return true;
        }
        let mut inner = self.inner.write();
        if inner.seen.contains_key(&key) {
            return false;
        }
        if inner.seen.len() >= self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.seen.remove(&oldest);
            }
        }
        inner.seen.insert(key, height);
        inner.order.push_back(key);
        true
    }

    /// Number of recorded keys.
    pub fn len(&self) -> usize {
        self.inner.read().seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
