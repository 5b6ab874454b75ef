//! Cores Manager (`spec.md` §4.4): a pool of cores selected by a
//! min-priority queue on forecast CPU load, enforcing the global CPU
//! ceiling via `Gauges`.

use std::sync::Arc;
use std::thread::JoinHandle;

use fail::fail_point;
use parking_lot::Mutex;
use tracing::info;

use crate::core::{self, Core, CoreId};
use crate::errors::SchedulerError;
use crate::gauges::Gauges;
use crate::heap::{Entry, Heap};
use crate::tx::StateKeys;

/// Distributes work across the least-loaded core until closed.
///
/// `cores` is retained independently of the forecast-load heap so
/// `close()` can signal every core unconditionally, regardless of which
/// core currently happens to be sitting in the heap — this is the fix for
/// the source's `Close()`, which only iterated an always-empty slice and
/// relied on the heap's contents to stop cores (`spec.md` §9).
pub struct CoresManager {
    cores: Vec<Arc<Core>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    heap: Mutex<Heap<CoreId, Arc<Core>, u64>>,
    gauges: Gauges,
}

impl CoresManager {
    pub fn new(core_count: usize, max_cpu_usage: u64) -> Self {
        let core_count = core_count.max(1);
        let mut cores = Vec::with_capacity(core_count);
        let mut handles = Vec::with_capacity(core_count);
        let mut heap = Heap::new(core_count, true);

        for id in 0..core_count {
            let (core, handle) = core::spawn(id);
            heap.push(Entry {
                id,
                item: core.clone(),
                val: 0,
            });
            cores.push(core);
            handles.push(handle);
        }

        CoresManager {
            cores,
            handles: Mutex::new(handles),
            heap: Mutex::new(heap),
            gauges: Gauges::new(core_count, max_cpu_usage),
        }
    }

    /// Distributes `f` to the least-loaded core after reserving `cpu_units`
    /// of its virtual time against `keys`. Returns `CpuLimitReached` if the
    /// least-loaded core would overcommit — since it is the least loaded,
    /// the whole pool has.
    pub fn execute(
        &self,
        f: Box<dyn FnOnce() + Send>,
        keys: &StateKeys,
        cpu_units: u64,
    ) -> Result<(), SchedulerError> {
        let mut heap = self.heap.lock();
        let entry = heap.pop().expect("cores heap is never empty");
        let core = entry.item;

        fail_point!("cores_manager::execute::cpu_limit_reached", |_| {
            heap.push(Entry {
                id: core.id(),
                item: core.clone(),
                val: entry.val,
            });
            Err(SchedulerError::CpuLimitReached { core_id: core.id() })
        });

        let (forecast, incremented) = self.gauges.increment(core.id(), keys, cpu_units);
        if !incremented {
            let core_id = core.id();
            heap.push(Entry {
                id: core_id,
                item: core,
                val: entry.val,
            });
            return Err(SchedulerError::CpuLimitReached { core_id });
        }

        heap.push(Entry {
            id: core.id(),
            item: core.clone(),
            val: forecast,
        });
        drop(heap);
        core.execute(f);
        Ok(())
    }

    /// Signals every core to stop and waits for all of them to drain.
    pub fn close(&self) {
        for core in &self.cores {
            core.stop();
        }
        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            let _ = handle.join();
        }
        info!(core_count = self.cores.len(), "cores manager drained");
    }
}
