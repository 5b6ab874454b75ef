//! Scheduler Loop (`spec.md` §4.6): pulls from the external priority heap,
//! decides execute-now vs block, and on each key release re-examines the
//! Blocked-Tx Index — biased toward draining releases before admitting new
//! work.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use tracing::warn;

use crate::blocked_txs::BlockedTxs;
use crate::cores_manager::CoresManager;
use crate::counters;
use crate::errors::SchedulerError;
use crate::locked_keys::LockedStateKeys;
use crate::tx::{StateKeys, Tx, TxHeap};

/// How long `run()` parks waiting for a release notification when the
/// external heap is momentarily empty but work is still in flight.
const RELEASE_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct Scheduler {
    tx_heap: Box<dyn TxHeap>,
    cores: Arc<CoresManager>,
    locked: Arc<LockedStateKeys>,
    blocked: BlockedTxs,
    release_rx: Receiver<StateKeys>,
    release_tx: Sender<StateKeys>,
    in_flight: Arc<AtomicUsize>,
    halted: AtomicBool,
}

impl Scheduler {
    pub fn new(tx_heap: Box<dyn TxHeap>, cpu_units_per_core: u64, core_count: usize) -> Self {
        let core_count = core_count.max(1);
        let (release_tx, release_rx) = channel::bounded(core_count);
        Scheduler {
            tx_heap,
            cores: Arc::new(CoresManager::new(core_count, cpu_units_per_core)),
            locked: Arc::new(LockedStateKeys::new()),
            blocked: BlockedTxs::new(),
            release_rx,
            release_tx,
            in_flight: Arc::new(AtomicUsize::new(0)),
            halted: AtomicBool::new(false),
        }
    }

    /// Runs until the external heap is drained (and every in-flight/blocked
    /// transaction has completed) or the CPU ceiling is reached.
    pub fn run(&mut self) {
        loop {
            self.drain_releases();
            if self.halted.load(Ordering::SeqCst) {
                return;
            }
            if !self.tx_heap.has_next() {
                if self.in_flight.load(Ordering::SeqCst) == 0 {
                    // `release -> send(keys) -> fetch_sub(1)` runs in that
                    // order inside the dispatch closure, so the send above
                    // may have landed on the channel after our last
                    // `drain_releases()` looked and before this load saw
                    // the counter reach zero. Drain once more before
                    // concluding nothing is left to unblock, or a release
                    // buffered in exactly that window is lost forever.
                    self.drain_releases();
                    if self.in_flight.load(Ordering::SeqCst) == 0 {
                        return;
                    }
                    continue;
                }
                // nothing new to admit; park for a release instead of
                // busy-spinning on the external heap.
                if let Ok(keys) = self.release_rx.recv_timeout(RELEASE_POLL_INTERVAL) {
                    self.execute_waiting_txs(&keys);
                }
                continue;
            }

            let Some(tx) = self.tx_heap.next() else {
                // `has_next` raced with `next`; treat as transiently empty
                // rather than dereferencing a transaction that isn't there
                // (the source's `executeNextTx` bug this spec fixes).
                continue;
            };
            self.execute_next_tx(tx);
        }
    }

    /// Signals the core pool to stop and waits for it to drain.
    pub fn close(&self) {
        self.cores.close();
    }

    fn drain_releases(&mut self) {
        loop {
            match self.release_rx.try_recv() {
                Ok(keys) => self.execute_waiting_txs(&keys),
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => return,
            }
        }
    }

    fn execute_next_tx(&mut self, tx: Arc<dyn Tx>) {
        if !self.locked.is_lockable(tx.state_keys()) || self.blocked.is_waiting_for(tx.state_keys()) {
            counters::BLOCKED_TXNS.inc();
            self.blocked.insert(tx);
        } else {
            self.dispatch(tx);
        }
    }

    /// Finds every transaction unblockable by `keys` releasing and
    /// dispatches each, repeating until no more can be unblocked.
    fn execute_waiting_txs(&mut self, keys: &StateKeys) {
        loop {
            let locked = &self.locked;
            let next = self
                .blocked
                .next_unblockable(keys, |k| locked.is_lockable(k));
            match next {
                Some(tx) => {
                    counters::UNBLOCKED_TXNS.inc();
                    self.dispatch(tx);
                }
                None => return,
            }
        }
    }

    /// Books `tx`'s keys and hands it to the core pool. Must only be called
    /// once lockability has already been confirmed under the loop's own
    /// single-threaded vantage point.
    fn dispatch(&mut self, tx: Arc<dyn Tx>) {
        let used = self.locked.use_keys(tx.state_keys());
        debug_assert!(used, "lockability was just checked by the caller");

        let keys = tx.state_keys().clone();
        let locked = self.locked.clone();
        let release_tx = self.release_tx.clone();
        let in_flight = self.in_flight.clone();
        let exec_tx = tx.clone();

        let closure: Box<dyn FnOnce() + Send> = Box::new(move || {
            exec_tx.execute();
            // Release refcounts before signalling: the scheduler loop's
            // `is_lockable` check inside `next_unblockable` would otherwise
            // see these exact keys as still held (`spec.md` §4.6 — the
            // fix for the source's executeTx, which signalled first).
            locked.release(&keys);
            if release_tx.send(keys.clone()).is_err() {
                warn!("release channel closed while a core still had in-flight work");
            }
            in_flight.fetch_sub(1, Ordering::SeqCst);
        });

        match self.cores.execute(closure, tx.state_keys(), tx.cpu_units()) {
            Ok(()) => {
                self.in_flight.fetch_add(1, Ordering::SeqCst);
                counters::DISPATCHED_TXNS.inc();
            }
            Err(SchedulerError::CpuLimitReached { .. }) => {
                counters::CPU_LIMIT_ABORTS.inc();
                self.halted.store(true, Ordering::SeqCst);
                // The scheduler instance is discarded after an abort (a
                // fresh one is built for the next block attempt), so `tx`'s
                // now-stale lock-table entry goes with it — matching the
                // source, which does not unwind `Use` on this path either.
                let mut pushback = vec![tx];
                pushback.extend(self.blocked.cleanup());
                self.tx_heap.push(pushback);
            }
        }
    }
}
