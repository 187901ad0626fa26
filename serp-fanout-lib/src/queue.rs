//! Shared FIFO of pending queries.
//!
//! The queue is fully seeded before any worker starts, so dequeue never
//! waits: an empty queue means the work is done.

use crate::types::Query;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct WorkQueue {
    items: Mutex<VecDeque<Query>>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a queue already holding `queries`, in order.
    pub fn seeded<I: IntoIterator<Item = Query>>(queries: I) -> Self {
        Self {
            items: Mutex::new(queries.into_iter().collect()),
        }
    }

    pub fn enqueue(&self, query: Query) {
        self.lock().push_back(query);
    }

    /// Take the next query, or `None` once the queue is drained.
    pub fn try_dequeue(&self) -> Option<Query> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding this lock cannot leave the deque half-updated,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Query>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
