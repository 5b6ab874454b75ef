//! Generic indexed binary heap.
//!
//! `std::collections::BinaryHeap` has no O(log n) removal for an arbitrary
//! element, which both the cores priority queue (`CoresManager`) and the
//! blocked-tx index (`BlockedTxs`) need: a core re-enters the heap on every
//! dispatch, and a tx must be pulled out of every heap it sits in as soon as
//! it is chosen to run. This keeps an `id -> index` map alongside the usual
//! array-backed heap so both operations stay logarithmic.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

/// One entry in the heap: an opaque id used for O(log n) removal, the
/// payload, and the key the heap orders on.
#[derive(Debug, Clone)]
pub struct Entry<I, T, V> {
    pub id: I,
    pub item: T,
    pub val: V,
}

/// Binary heap ordered by `V`, indexed by `I` for removal by id.
///
/// `min` selects min-heap (smallest `val` on top, used by the cores queue)
/// vs max-heap (largest `val` on top, used by the blocked-tx index)
/// ordering; both share the same removal machinery.
pub struct Heap<I, T, V> {
    entries: Vec<Entry<I, T, V>>,
    index_of: HashMap<I, usize>,
    min: bool,
}

impl<I, T, V> Heap<I, T, V>
where
    I: Eq + Hash + Clone,
    V: Ord,
{
    pub fn new(capacity_hint: usize, min: bool) -> Self {
        Heap {
            entries: Vec::with_capacity(capacity_hint),
            index_of: HashMap::with_capacity(capacity_hint),
            min,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn better(&self, a: &V, b: &V) -> bool {
        if self.min {
            a < b
        } else {
            a > b
        }
    }

    /// Push a new entry, bubbling it up to its sorted position.
    pub fn push(&mut self, entry: Entry<I, T, V>) {
        let idx = self.entries.len();
        self.index_of.insert(entry.id.clone(), idx);
        self.entries.push(entry);
        self.sift_up(idx);
    }

    /// Peek at the top entry without removing it.
    pub fn peek(&self) -> Option<&Entry<I, T, V>> {
        self.entries.first()
    }

    /// Pop the top entry.
    pub fn pop(&mut self) -> Option<Entry<I, T, V>> {
        if self.entries.is_empty() {
            return None;
        }
        Some(self.remove_at(0))
    }

    /// Look up an entry by id without removing it.
    pub fn get(&self, id: &I) -> Option<&Entry<I, T, V>> {
        self.index_of.get(id).map(|&idx| &self.entries[idx])
    }

    /// Remove the entry with the given id, wherever it currently sits.
    pub fn remove(&mut self, id: &I) -> Option<Entry<I, T, V>> {
        let idx = *self.index_of.get(id)?;
        Some(self.remove_at(idx))
    }

    fn remove_at(&mut self, idx: usize) -> Entry<I, T, V> {
        let last = self.entries.len() - 1;
        self.entries.swap(idx, last);
        let removed = self.entries.pop().expect("checked non-empty");
        self.index_of.remove(&removed.id);
        if idx < self.entries.len() {
            self.index_of.insert(self.entries[idx].id.clone(), idx);
            // the swapped-in element may need to move either direction
            self.sift_down(idx);
            self.sift_up(idx);
        }
        removed
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if self.better(&self.entries[idx].val, &self.entries[parent].val) {
                self.swap(idx, parent);
                idx = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * idx + 1;
            let right = 2 * idx + 2;
            let mut best = idx;
            if left < len && self.better(&self.entries[left].val, &self.entries[best].val) {
                best = left;
            }
            if right < len && self.better(&self.entries[right].val, &self.entries[best].val) {
                best = right;
            }
            if best == idx {
                break;
            }
            self.swap(idx, best);
            idx = best;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.entries.swap(a, b);
        self.index_of.insert(self.entries[a].id.clone(), a);
        self.index_of.insert(self.entries[b].id.clone(), b);
    }
}

impl<I, T, V> Ord for Entry<I, T, V>
where
    V: Ord,
{
    fn cmp(&self, other: &Self) -> Ordering {
        self.val.cmp(&other.val)
    }
}

impl<I, T, V> PartialOrd for Entry<I, T, V>
where
    V: Ord,
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<I, T, V> PartialEq for Entry<I, T, V>
where
    V: Ord,
{
    fn eq(&self, other: &Self) -> bool {
        self.val == other.val
    }
}

impl<I, T, V> Eq for Entry<I, T, V> where V: Ord {}
