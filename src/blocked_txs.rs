//! Blocked-Tx Index (`spec.md` §4.5): maps each state key to a max-heap of
//! transactions blocked on it, keyed by priority fee, with fair unblocking.

use std::collections::HashMap;
use std::sync::Arc;

use crate::heap::{Entry, Heap};
use crate::tx::{StateKey, StateKeys, Tx, TxId};

/// Transactions blocked on presently-unavailable state keys, indexed by
/// every key each transaction touches so removal is atomic across all of
/// them.
#[derive(Default)]
pub struct BlockedTxs {
    by_key: HashMap<StateKey, Heap<TxId, Arc<dyn Tx>, u64>>,
}

impl BlockedTxs {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff any of `keys` currently has a transaction blocked on it.
    /// The fairness gate: a fresh transaction must not bypass a previously
    /// queued conflict on an unrelated but presently-blocked key.
    pub fn is_waiting_for(&self, keys: &StateKeys) -> bool {
        keys.keys().any(|key| self.by_key.contains_key(key))
    }

    /// Push `tx` onto the max-heap of every state key it touches.
    pub fn insert(&mut self, tx: Arc<dyn Tx>) {
        for key in tx.state_keys().keys() {
            let heap = self
                .by_key
                .entry(key.clone())
                .or_insert_with(|| Heap::new(1, false));
            heap.push(Entry {
                id: tx.id(),
                item: tx.clone(),
                val: tx.priority_fee(),
            });
        }
    }

    /// Selects the highest-priority transaction that (a) sits at the head
    /// of at least one of `trigger_keys`' heaps, (b) is not dominated on any
    /// other key by a strictly higher-priority head there, and (c) is
    /// currently lockable. Removes and returns it from every heap it
    /// appears in.
    pub fn next_unblockable(
        &mut self,
        trigger_keys: &StateKeys,
        is_lockable: impl Fn(&StateKeys) -> bool,
    ) -> Option<Arc<dyn Tx>> {
        let mut best: Option<(Arc<dyn Tx>, u64)> = None;

        for triggered_key in trigger_keys.keys() {
            let Some(heap) = self.by_key.get(triggered_key) else {
                continue;
            };
            let Some(head) = heap.peek() else {
                continue;
            };

            let dominated = head.item.state_keys().keys().any(|other_key| {
                if other_key == triggered_key {
                    return false;
                }
                self.by_key
                    .get(other_key)
                    .and_then(Heap::peek)
                    .is_some_and(|opponent| opponent.val > head.val)
            });
            if dominated {
                continue;
            }

            if !is_lockable(head.item.state_keys()) {
                continue;
            }

            let better = match &best {
                None => true,
                Some((_, best_priority)) => head.val > *best_priority,
            };
            if better {
                best = Some((head.item.clone(), head.val));
            }
        }

        let (tx, _) = best?;
        self.remove_everywhere(tx.id(), tx.state_keys());
        Some(tx)
    }

    fn remove_everywhere(&mut self, id: TxId, keys: &StateKeys) {
        for key in keys.keys() {
            if let Some(heap) = self.by_key.get_mut(key) {
                heap.remove(&id);
                if heap.is_empty() {
                    self.by_key.remove(key);
                }
            }
        }
    }

    /// Pops and returns every blocked transaction, used when the scheduler
    /// aborts with an unusable queue.
    pub fn cleanup(&mut self) -> Vec<Arc<dyn Tx>> {
        let mut seen = std::collections::HashSet::new();
        let mut txs = Vec::new();
        for heap in self.by_key.values_mut() {
            while let Some(entry) = heap.pop() {
                if seen.insert(entry.id) {
                    txs.push(entry.item);
                }
            }
        }
        self.by_key.clear();
        txs
    }
}
