//! FIFO queue of closures, owned by exactly one `Core` (`spec.md` §4.1).
//! Push and pop are mutually exclusive under one lock; both are O(1).
//! The source's implementation is a hand-rolled singly-linked list; a
//! `VecDeque` behind a single mutex gives the identical FIFO/O(1) contract
//! without reaching for unsafe pointer bookkeeping to track the tail.

use std::collections::VecDeque;

use parking_lot::Mutex;

type Task = Box<dyn FnOnce() + Send>;

#[derive(Default)]
pub struct TaskQueue {
    inner: Mutex<VecDeque<Task>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a closure to the tail of the queue.
    pub fn push(&self, task: Task) {
        self.inner.lock().push_back(task);
    }

    /// Pop the closure at the head of the queue, if any.
    pub fn pop(&self) -> Option<Task> {
        self.inner.lock().pop_front()
    }
}
