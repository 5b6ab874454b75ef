//! Construction-time configuration, layered above `Scheduler::new`'s
//! positional arguments the way `aptos-block-executor::BlockExecutor::new`
//! keeps its raw `concurrency_level` / `maybe_block_gas_limit` constructor
//! beneath any higher config surface.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of worker cores in the pool. Defaults to the host's logical
    /// CPU count, matching the assertion `concurrency_level <= num_cpus::get()`
    /// in the teacher's `BlockExecutor::new`.
    pub core_count: usize,
    /// Per-core CPU unit ceiling for one block.
    pub cpu_units_per_core: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            core_count: num_cpus::get().max(1),
            cpu_units_per_core: 1_000_000,
        }
    }
}

impl SchedulerConfig {
    pub fn new(core_count: usize, cpu_units_per_core: u64) -> Self {
        SchedulerConfig {
            core_count: core_count.max(1),
            cpu_units_per_core,
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn default_sizes_from_host_cpus() {
        let cfg = SchedulerConfig::default();
        assert!(cfg.core_count >= 1);
        assert_eq!(cfg.cpu_units_per_core, 1_000_000);
    }

    #[test]
    fn new_clamps_zero_core_count() {
        let cfg = SchedulerConfig::new(0, 10);
        assert_eq!(cfg.core_count, 1);
    }
}
