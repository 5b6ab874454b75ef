//! Error taxonomy (`spec.md` §7). `CpuLimitReached` is the only fault a
//! caller of this crate observes; it is a normal block-boundary condition,
//! not a bug, so it carries no `anyhow` backtrace — just the core that hit
//! the ceiling.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("cpu limit reached for core {core_id}")]
    CpuLimitReached { core_id: usize },
}
