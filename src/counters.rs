//! Scheduler metrics, registered the way `aptos-block-executor::counters`
//! and `indexer-grpc-utils::counters` register theirs: `once_cell::Lazy`
//! statics wrapping `prometheus` collectors. None of this is load-bearing
//! for scheduling decisions — it is pure observability.

use once_cell::sync::Lazy;
use prometheus::{register_histogram, register_int_counter, Histogram, IntCounter};

pub static DISPATCHED_TXNS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "scheduler_dispatched_txns_total",
        "Transactions dispatched directly to a core without blocking"
    )
    .unwrap()
});

pub static BLOCKED_TXNS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "scheduler_blocked_txns_total",
        "Transactions inserted into the blocked-tx index"
    )
    .unwrap()
});

pub static UNBLOCKED_TXNS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "scheduler_unblocked_txns_total",
        "Transactions pulled out of the blocked-tx index and dispatched"
    )
    .unwrap()
});

pub static CPU_LIMIT_ABORTS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "scheduler_cpu_limit_aborts_total",
        "Block-boundary aborts caused by a core exceeding its CPU ceiling"
    )
    .unwrap()
});

pub static GAUGE_INCREMENT_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "scheduler_gauge_increment_seconds",
        "Time spent inside Gauges::increment per dispatch"
    )
    .unwrap()
});
