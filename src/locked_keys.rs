//! Key Lock Table (`spec.md` §4.2): tracks which state keys are currently
//! in use and under which permission, permitting shared reads. A
//! many-reader/one-writer lock fits since `is_lockable` only reads.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::tx::{Permission, StateKey, StateKeys};

#[derive(Default)]
struct Inner {
    held_perm: HashMap<StateKey, Permission>,
    refcount: HashMap<StateKey, u64>,
}

/// Tracks state-key usage: `refcount[key] > 0 <=> key in held_perm`, and
/// more than one holder implies all holders are `Read`.
#[derive(Default)]
pub struct LockedStateKeys {
    inner: RwLock<Inner>,
}

impl LockedStateKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff every requested `(key, perm)` either targets an unheld key
    /// or is compatible with the current holder (`Read` asking `Read`).
    pub fn is_lockable(&self, keys: &StateKeys) -> bool {
        let inner = self.inner.read();
        keys.iter().all(|(key, asking_perm)| match inner.held_perm.get(key) {
            None => true,
            Some(held_perm) => held_perm.is_read() && asking_perm.is_read(),
        })
    }

    /// Atomically checks `is_lockable` and, if it holds, marks every key as
    /// used under its requested permission. Returns false without mutation
    /// on conflict.
    pub fn use_keys(&self, keys: &StateKeys) -> bool {
        let mut inner = self.inner.write();
        let lockable = keys.iter().all(|(key, asking_perm)| match inner.held_perm.get(key) {
            None => true,
            Some(held_perm) => held_perm.is_read() && asking_perm.is_read(),
        });
        if !lockable {
            return false;
        }
        for (key, perm) in keys {
            *inner.refcount.entry(key.clone()).or_insert(0) += 1;
            inner.held_perm.insert(key.clone(), *perm);
        }
        true
    }

    /// Decrements the refcount for each held key, removing the entry once
    /// it reaches zero.
    pub fn release(&self, keys: &StateKeys) {
        let mut inner = self.inner.write();
        for key in keys.keys() {
            let Some(count) = inner.refcount.get_mut(key) else {
                continue;
            };
            if *count == 0 {
                continue;
            }
            *count -= 1;
            if *count == 0 {
                inner.refcount.remove(key);
                inner.held_perm.remove(key);
            }
        }
    }
}
