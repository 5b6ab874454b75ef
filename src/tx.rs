//! Data model the scheduler consumes: transactions, state keys, and the
//! external priority heap contract. Everything here is opaque to the
//! scheduler beyond key equality and the `Read` comparison (`spec.md` §3).

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Unique transaction identifier. Stands in for the source's 32-byte
/// content-addressed id; the scheduler only needs equality and use as a
/// heap/map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxId(pub u64);

/// Opaque identity for a cell of blockchain state a transaction reads or
/// writes.
pub type StateKey = Arc<str>;

/// Access mode requested for a state key. Two holders of the same key may
/// coexist iff both request `Read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    Read,
    Write,
    Allocate,
}

impl Permission {
    pub fn is_read(&self) -> bool {
        matches!(self, Permission::Read)
    }
}

/// A transaction's declared state-key footprint: key -> requested permission.
pub type StateKeys = HashMap<StateKey, Permission>;

/// A transaction as the scheduler sees it. The scheduler never inspects
/// `execute`'s effects; it is handed off opaquely once the transaction's
/// keys are locked.
pub trait Tx: Send + Sync {
    fn id(&self) -> TxId;
    fn state_keys(&self) -> &StateKeys;
    fn cpu_units(&self) -> u64;
    fn priority_fee(&self) -> u64;
    fn execute(&self);
}

/// The external max-heap-on-priority-fee the scheduler pulls from.
/// Ordering policy belongs entirely to the implementation; the scheduler
/// only assumes higher fee surfaces first.
pub trait TxHeap: Send {
    fn has_next(&self) -> bool;
    fn next(&mut self) -> Option<Arc<dyn Tx>>;
    fn push(&mut self, txs: Vec<Arc<dyn Tx>>);
}

#[cfg(any(test, feature = "testing"))]
pub mod test_support {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
    use std::sync::Mutex;

    /// A closure-backed `Tx` for unit/integration tests.
    pub struct TestTx {
        id: TxId,
        keys: StateKeys,
        cpu_units: u64,
        priority_fee: u64,
        ran: Arc<AtomicU64>,
        on_execute: Box<dyn Fn() + Send + Sync>,
    }

    impl TestTx {
        pub fn new(
            id: u64,
            keys: &[(&str, Permission)],
            cpu_units: u64,
            priority_fee: u64,
        ) -> Arc<Self> {
            Self::with_hook(id, keys, cpu_units, priority_fee, || {})
        }

        pub fn with_hook(
            id: u64,
            keys: &[(&str, Permission)],
            cpu_units: u64,
            priority_fee: u64,
            on_execute: impl Fn() + Send + Sync + 'static,
        ) -> Arc<Self> {
            let mut state_keys = StateKeys::new();
            for (k, p) in keys {
                state_keys.insert(Arc::from(*k), *p);
            }
            Arc::new(TestTx {
                id: TxId(id),
                keys: state_keys,
                cpu_units,
                priority_fee,
                ran: Arc::new(AtomicU64::new(0)),
                on_execute: Box::new(on_execute),
            })
        }

        pub fn run_count(&self) -> u64 {
            self.ran.load(AtomicOrdering::SeqCst)
        }
    }

    impl Tx for TestTx {
        fn id(&self) -> TxId {
            self.id
        }

        fn state_keys(&self) -> &StateKeys {
            &self.keys
        }

        fn cpu_units(&self) -> u64 {
            self.cpu_units
        }

        fn priority_fee(&self) -> u64 {
            self.priority_fee
        }

        fn execute(&self) {
            (self.on_execute)();
            self.ran.fetch_add(1, AtomicOrdering::SeqCst);
        }
    }

    /// A `TxHeap` backed by a simple FIFO, sufficient for deterministic
    /// tests that control arrival order explicitly rather than relying on
    /// fee-based reordering.
    #[derive(Default)]
    pub struct FifoTxHeap {
        inner: Mutex<VecDeque<Arc<dyn Tx>>>,
    }

    impl FifoTxHeap {
        pub fn new(txs: Vec<Arc<dyn Tx>>) -> Self {
            FifoTxHeap {
                inner: Mutex::new(txs.into()),
            }
        }
    }

    impl TxHeap for FifoTxHeap {
        fn has_next(&self) -> bool {
            !self.inner.lock().unwrap().is_empty()
        }

        fn next(&mut self) -> Option<Arc<dyn Tx>> {
            self.inner.lock().unwrap().pop_front()
        }

        fn push(&mut self, txs: Vec<Arc<dyn Tx>>) {
            let mut guard = self.inner.lock().unwrap();
            for tx in txs {
                guard.push_back(tx);
            }
        }
    }
}
