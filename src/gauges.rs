//! CPU Gauges (`spec.md` §4.3): per-core virtual time plus a released-key
//! history that prevents a later conflicting dispatch from claiming
//! phantom parallelism with a key's previous holder.
//!
//! The source records `releasedKeys[key]` under an equality comparison
//! against the *new* time, which can clobber a later released time
//! recorded by another core. This adopts the monotonic-max fix the spec
//! calls out in §4.3/§9: a key's recorded released time never decreases.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::counters;
use crate::tx::{Permission, StateKey, StateKeys};

#[derive(Debug, Clone, Copy)]
struct ReleasedEntry {
    perm: Permission,
    released_time: u64,
}

struct Inner {
    time: Vec<u64>,
    released_keys: HashMap<StateKey, ReleasedEntry>,
}

/// Per-core virtual-time accounting against a shared CPU ceiling.
pub struct Gauges {
    inner: Mutex<Inner>,
    max_cpu_usage: u64,
}

impl Gauges {
    pub fn new(n_cores: usize, max_cpu_usage: u64) -> Self {
        Gauges {
            inner: Mutex::new(Inner {
                time: vec![0; n_cores],
                released_keys: HashMap::new(),
            }),
            max_cpu_usage,
        }
    }

    /// Advances `core_id`'s virtual time by `units`, first forward-projecting
    /// past any incompatible later-released holder of the requested keys.
    /// Returns `(new_time, true)` on success, `(0, false)` if the ceiling
    /// would be exceeded, without mutating state in that case.
    pub fn increment(&self, core_id: usize, keys: &StateKeys, units: u64) -> (u64, bool) {
        let _timer = counters::GAUGE_INCREMENT_SECONDS.start_timer();
        let mut inner = self.inner.lock();
        let mut t = inner.time[core_id];

        for (key, ask_perm) in keys {
            if let Some(history) = inner.released_keys.get(key) {
                if history.released_time > t && history.perm != *ask_perm {
                    t = history.released_time;
                }
            }
        }

        let new_time = t + units;
        if new_time > self.max_cpu_usage {
            return (0, false);
        }

        for (key, ask_perm) in keys {
            let keep_existing = inner
                .released_keys
                .get(key)
                .is_some_and(|history| history.released_time > new_time);
            if !keep_existing {
                inner.released_keys.insert(
                    key.clone(),
                    ReleasedEntry {
                        perm: *ask_perm,
                        released_time: new_time,
                    },
                );
            }
        }

        inner.time[core_id] = new_time;
        (new_time, true)
    }
}
